//! Modal UI rendering functions.

use std::path::Path;

use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::App;
use crate::modals::{
    AiTab, BlockEditorField, ConfirmButton, ConfirmKind, MetadataField, TextInput,
};
use crate::render;
use crate::template::{Category, SUGGESTED_TAGS};
use crate::ui::{
    block_type_color, centered_rect, contract_path, format_timestamp, preview_lines, truncate_str,
};

/// Visible text field width inside modals.
const FIELD_WIDTH: usize = 48;

/// Render a text field. The visible window follows the cursor when the value is long.
fn input_spans(input: &TextInput, focused: bool) -> Vec<Span<'static>> {
    let chars: Vec<char> = input.value().chars().collect();
    let cursor = input.cursor();
    let start = if chars.len() > FIELD_WIDTH {
        let end = (cursor.saturating_sub(FIELD_WIDTH / 2) + FIELD_WIDTH).min(chars.len());
        end.saturating_sub(FIELD_WIDTH)
    } else {
        0
    };
    let end = (start + FIELD_WIDTH).min(chars.len());
    let visible: String = chars[start..end].iter().collect();

    if !focused {
        return vec![Span::styled(visible, Style::default().fg(Color::White))];
    }

    let visible_cursor = cursor - start;
    let before: String = visible.chars().take(visible_cursor).collect();
    let at: String = visible
        .chars()
        .nth(visible_cursor)
        .map(String::from)
        .unwrap_or_else(|| " ".to_string());
    let rest: String = visible.chars().skip(visible_cursor + 1).collect();
    vec![
        Span::styled(before, Style::default().fg(Color::White)),
        Span::styled(at, Style::default().fg(Color::Black).bg(Color::White)),
        Span::styled(rest, Style::default().fg(Color::White)),
    ]
}

fn label_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn button(label: &str, focused: bool) -> Span<'static> {
    let style = if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    Span::styled(format!("[ {} ]", label), style)
}

fn field_line(label: &str, input: &TextInput, focused: bool) -> Line<'static> {
    let mut spans = vec![Span::styled(format!("  {:<12}", label), label_style(focused))];
    spans.extend(input_spans(input, focused));
    Line::from(spans)
}

fn modal_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(Color::White))
}

/// Draw the block editor modal.
pub fn draw_block_editor_modal(f: &mut Frame, app: &App) {
    let Some(state) = &app.block_editor else {
        return;
    };

    let modal_width: u16 = 70;
    let completion_rows = if state.completions.is_empty() {
        0
    } else {
        state.completions.len() as u16 + 2
    };
    let modal_height: u16 = 11 + completion_rows;
    let modal_area = centered_rect(modal_width, modal_height, f.area());
    f.render_widget(Clear, modal_area);

    let fields = BlockEditorField::fields_for(state.block_type);
    let mut content = vec![Line::from(vec![
        Span::styled("  Type        ", label_style(false)),
        Span::styled(
            state.block_type.label(),
            Style::default().fg(block_type_color(state.block_type)),
        ),
        Span::styled(
            format!("  {}", state.block_type.description()),
            Style::default().fg(Color::DarkGray),
        ),
    ])];
    content.push(Line::from(""));

    for field in fields {
        let focused = state.focus == *field;
        let label = field.label(state.block_type);
        match field {
            BlockEditorField::Content => content.push(field_line(label, &state.content, focused)),
            BlockEditorField::Description => {
                content.push(field_line(label, &state.description, focused))
            }
            BlockEditorField::Options => {
                content.push(field_line(label, &state.options, focused));
                content.push(Line::from(Span::styled(
                    "              separate options with |",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            BlockEditorField::SaveButton | BlockEditorField::CancelButton => {}
        }
    }

    if state.autocomplete_loading {
        content.push(Line::from(Span::styled(
            "  Thinking...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    if !state.completions.is_empty() {
        content.push(Line::from(""));
        content.push(Line::from(Span::styled(
            "  Suggestions (↑/↓, Enter to use)",
            Style::default().fg(Color::DarkGray),
        )));
        for (i, completion) in state.completions.iter().enumerate() {
            let selected = state.completion_selected == Some(i);
            let style = if selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            let mut spans = vec![Span::styled(
                format!("    {}", truncate_str(&completion.text, 40)),
                style,
            )];
            if !completion.explanation.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", truncate_str(&completion.explanation, 20)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            content.push(Line::from(spans));
        }
    }

    content.push(Line::from(""));
    content.push(Line::from(vec![
        Span::raw("  "),
        button("Save", state.focus == BlockEditorField::SaveButton),
        Span::raw("  "),
        button("Cancel", state.focus == BlockEditorField::CancelButton),
        Span::styled("   Ctrl+S save · Esc close", Style::default().fg(Color::DarkGray)),
    ]));

    let title = if state.is_new { "Add Block" } else { "Edit Block" };
    f.render_widget(Paragraph::new(content).block(modal_block(title)), modal_area);
}

/// Draw the title/description/category/tag editor.
pub fn draw_metadata_modal(f: &mut Frame, app: &App) {
    let Some(state) = &app.metadata_modal else {
        return;
    };

    let modal_width: u16 = 76;
    let modal_height: u16 = 20;
    let modal_area = centered_rect(modal_width, modal_height, f.area());
    f.render_widget(Clear, modal_area);

    let hint = |text: Option<String>| -> Line<'static> {
        match text {
            Some(t) => Line::from(Span::styled(
                format!("              {}", t),
                Style::default().fg(Color::Yellow),
            )),
            None => Line::from(""),
        }
    };

    let mut content = vec![
        field_line("Title", &state.title, state.focus == MetadataField::Title),
        hint(crate::validators::validate_title(state.title.value())),
        field_line(
            "Description",
            &state.description,
            state.focus == MetadataField::Description,
        ),
        hint(crate::validators::validate_description(
            state.description.value(),
        )),
    ];

    let categories_focused = state.focus == MetadataField::Categories;
    content.push(Line::from(Span::styled(
        "  Categories  (←/→ move, Space toggle)",
        label_style(categories_focused),
    )));
    let mut category_spans = vec![Span::raw("    ")];
    for (i, category) in Category::ALL.iter().enumerate() {
        let checked = state.categories.contains(category);
        let mut style = if checked {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if categories_focused && i == state.category_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let mark = if checked { "■" } else { "□" };
        category_spans.push(Span::styled(format!("{} {}", mark, category.label()), style));
        category_spans.push(Span::raw(" "));
    }
    content.push(Line::from(category_spans));
    content.push(hint(crate::validators::validate_categories(
        state.categories.len(),
    )));

    let mut tag_spans = vec![Span::styled(
        "  Tags        ",
        label_style(state.focus == MetadataField::Tags),
    )];
    for tag in &state.tags {
        tag_spans.push(Span::styled(format!("#{} ", tag), Style::default().fg(Color::Cyan)));
    }
    tag_spans.extend(input_spans(
        &state.tag_input,
        state.focus == MetadataField::Tags,
    ));
    content.push(Line::from(tag_spans));

    let suggested_focused = state.focus == MetadataField::SuggestedTags;
    content.push(Line::from(Span::styled(
        "  Suggested   (←/→ move, Space toggle)",
        label_style(suggested_focused),
    )));
    let mut suggested_spans = vec![Span::raw("    ")];
    for (i, tag) in SUGGESTED_TAGS.iter().enumerate() {
        let added = state.tags.iter().any(|t| t == tag);
        let mut style = if added {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if suggested_focused && i == state.suggested_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        suggested_spans.push(Span::styled(tag.to_string(), style));
        suggested_spans.push(Span::raw(" "));
    }
    content.push(Line::from(suggested_spans));

    content.push(Line::from(""));
    content.push(Line::from(vec![
        Span::raw("  "),
        button("Apply", state.focus == MetadataField::SaveButton),
        Span::raw("  "),
        button("Cancel", state.focus == MetadataField::CancelButton),
    ]));

    let paragraph = Paragraph::new(content)
        .block(modal_block("Prompt Details"))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, modal_area);
}

/// Draw the yes/no confirmation dialog.
pub fn draw_confirm_modal(f: &mut Frame, app: &App) {
    let Some(state) = &app.confirm else {
        return;
    };

    let modal_area = centered_rect(56, 7, f.area());
    f.render_widget(Clear, modal_area);

    let (title, confirm_label) = match state.kind {
        ConfirmKind::Discard(_) => ("Unsaved Changes", "Discard"),
        ConfirmKind::Delete { .. } => ("Delete Prompt", "Delete"),
    };
    let content = vec![
        Line::from(""),
        Line::from(format!("  {}", state.message())),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            button(confirm_label, state.focus == ConfirmButton::Confirm),
            Span::raw("  "),
            button("Cancel", state.focus == ConfirmButton::Cancel),
        ]),
    ];
    let modal = Paragraph::new(content)
        .block(modal_block(title).style(Style::default().fg(Color::Yellow)))
        .wrap(Wrap { trim: false });
    f.render_widget(modal, modal_area);
}

/// Draw the list of reasons the template could not be saved.
pub fn draw_save_errors_modal(f: &mut Frame, app: &App) {
    let Some(errors) = &app.save_errors else {
        return;
    };

    let modal_height = errors.len() as u16 + 5;
    let modal_area = centered_rect(50, modal_height, f.area());
    f.render_widget(Clear, modal_area);

    let mut content = vec![Line::from("")];
    content.extend(errors.iter().map(|e| {
        Line::from(vec![
            Span::styled("  ✗ ", Style::default().fg(Color::Red)),
            Span::raw(e.clone()),
        ])
    }));
    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Enter or Esc to close",
        Style::default().fg(Color::DarkGray),
    )));

    let modal = Paragraph::new(content)
        .block(modal_block("Cannot Save").style(Style::default().fg(Color::Red)));
    f.render_widget(modal, modal_area);
}

/// Draw the AI suggestions and examples panel.
pub fn draw_ai_panel(f: &mut Frame, app: &App) {
    let Some(state) = &app.ai_panel else {
        return;
    };

    let area = f.area();
    let modal_area = centered_rect(area.width.saturating_sub(10).min(90), area.height.saturating_sub(6), area);
    f.render_widget(Clear, modal_area);

    let tab_style = |tab: AiTab| {
        if state.tab == tab {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    let mut content = vec![
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Suggestions", tab_style(AiTab::Suggestions)),
            Span::raw("   "),
            Span::styled("Examples", tab_style(AiTab::Examples)),
        ]),
        Line::from(""),
    ];

    match state.tab {
        AiTab::Suggestions => {
            if app.suggestions_loading {
                content.push(Line::from("  Asking for suggestions..."));
            } else if app.suggestions.is_empty() {
                content.push(Line::from(Span::styled(
                    "  No suggestions yet. Press r to ask.",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            if app.suggestions_outdated() {
                content.push(Line::from(Span::styled(
                    "  The prompt changed since these were made. Press r to refresh.",
                    Style::default().fg(Color::Yellow),
                )));
            }
            for (i, suggestion) in app.suggestions.iter().enumerate() {
                let marker = if i == state.selected { "▶ " } else { "  " };
                content.push(Line::from(vec![
                    Span::raw(marker),
                    Span::styled(
                        format!("{:<10}", suggestion.kind.label()),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::styled(
                        suggestion.text.clone(),
                        if i == state.selected {
                            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(Color::White)
                        },
                    ),
                ]));
                if let Some(explanation) = &suggestion.explanation {
                    content.push(Line::from(Span::styled(
                        format!("            {}", explanation),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
        }
        AiTab::Examples => {
            if app.examples_loading {
                content.push(Line::from("  Generating examples..."));
            } else if app.examples.is_empty() {
                content.push(Line::from(Span::styled(
                    "  No examples yet. Press r to generate.",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            for (i, example) in app.examples.iter().enumerate() {
                let marker = if i == state.selected { "▶ " } else { "  " };
                content.push(Line::from(vec![
                    Span::raw(marker),
                    Span::styled("Input:  ", Style::default().fg(Color::Cyan)),
                    Span::raw(example.input.clone()),
                ]));
                content.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled("Output: ", Style::default().fg(Color::Green)),
                    Span::raw(example.output.clone()),
                ]));
                if !example.explanation.is_empty() {
                    content.push(Line::from(Span::styled(
                        format!("  {}", example.explanation),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                content.push(Line::from(""));
            }
        }
    }

    let footer = match state.tab {
        AiTab::Suggestions => " Enter add as block · r refresh · Tab examples · Esc close ",
        AiTab::Examples => " r regenerate · Tab suggestions · Esc close ",
    };
    let block = modal_block("AI Assistant").title_bottom(Line::from(footer).centered());
    let modal = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(modal, modal_area);
}

/// Draw the read-only template viewer.
pub fn draw_template_view(f: &mut Frame, app: &App) {
    let Some(state) = &app.template_view else {
        return;
    };
    let template = &state.template;

    let area = f.area();
    let modal_area = centered_rect(area.width.saturating_sub(10).min(90), area.height.saturating_sub(6), area);
    f.render_widget(Clear, modal_area);

    let author = template
        .user_name
        .clone()
        .or_else(|| template.user_id.clone())
        .unwrap_or_default();
    let mut content = vec![
        Line::from(Span::styled(
            template.description.clone(),
            Style::default().fg(Color::White),
        )),
        Line::from(Span::styled(
            format!("by {} · {}", author, format_timestamp(template.created_at)),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    content.extend(preview_lines(&render::preview(template)));

    let owned = template.is_owned_by(&app.owner.user_id);
    let footer = if owned {
        " e edit · Esc close "
    } else {
        " Esc close "
    };
    let block = modal_block(&template.title).title_bottom(Line::from(footer).centered());
    let modal = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0));
    f.render_widget(modal, modal_area);
}

/// Draw the help modal.
/// Where this session keeps its settings and logs.
struct SessionPaths<'a> {
    session_id: &'a str,
    config: &'a Path,
    project_config: Option<&'a Path>,
    logs: Option<&'a Path>,
}

fn session_lines(paths: &SessionPaths, width: usize, label_style: Style) -> Vec<Line<'static>> {
    let value_width = width.saturating_sub(13);
    let row = |label: &'static str, value: String| {
        Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("{:<9}", label), label_style),
            Span::raw(truncate_str(&value, value_width)),
        ])
    };

    let mut lines = vec![
        row("ID", paths.session_id.to_string()),
        row("Config", contract_path(paths.config)),
    ];
    if let Some(project) = paths.project_config {
        lines.push(row("Project", contract_path(project)));
    }
    lines.push(row(
        "Logs",
        paths
            .logs
            .map(contract_path)
            .unwrap_or_else(|| "(not configured)".to_string()),
    ));
    lines
}

pub fn draw_help_modal(f: &mut Frame, app: &App) {
    let paths = SessionPaths {
        session_id: &app.session_id,
        config: &app.config_path,
        project_config: app.project_config_path.as_deref(),
        logs: app.log_directory.as_deref(),
    };
    let modal_width: u16 = 60;
    let inner_width = modal_width.saturating_sub(4) as usize;

    let key_style = Style::default().fg(Color::Cyan);
    let desc_style = Style::default().fg(Color::DarkGray);
    let header_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);

    let entry = |key: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("{:<10}", key), key_style),
            Span::styled(desc, desc_style),
        ])
    };

    let footer_text = "? or Esc to close";
    let footer_padding = inner_width.saturating_sub(footer_text.len());

    let mut content: Vec<Line> = vec![
        Line::from(Span::styled("  Screens", header_style)),
        entry("F1-F5", "Builder, Gallery, Mine, Learn, Community"),
        entry("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Builder", header_style)),
        entry("t v o -", "Add text, variable, options, separator"),
        entry("e Enter", "Edit selected block"),
        entry("d Del", "Delete selected block"),
        entry("J / K", "Move block down / up"),
        entry("m", "Title, description, categories, tags"),
        entry("1-7", "Toggle a category"),
        entry("Tab", "Preview / code / plain text"),
        entry("w", "Write plain text to a file"),
        entry("s", "Save"),
        entry("n", "New prompt"),
        entry("Ctrl+Z/Y", "Undo / redo"),
        entry("a / x", "AI suggestions / examples"),
        Line::from(""),
        Line::from(Span::styled("  Gallery", header_style)),
        entry("/", "Search"),
        entry("c / o", "Cycle category / sort"),
        entry("Enter", "View prompt"),
        Line::from(""),
        Line::from(Span::styled("  Session", header_style)),
    ];
    content.extend(session_lines(&paths, inner_width, desc_style));
    content.push(Line::from(""));
    content.push(Line::from(vec![
        Span::raw(" ".repeat(footer_padding)),
        Span::styled(footer_text, desc_style),
    ]));

    let modal_height = content.len() as u16 + 2;
    let modal_area = centered_rect(modal_width, modal_height, f.area());

    // Clear the area behind the modal
    f.render_widget(Clear, modal_area);
    let modal = Paragraph::new(content).block(modal_block("Help"));
    f.render_widget(modal, modal_area);
}
