//! UI rendering functions.

use std::path::Path;

use chrono::{DateTime, Local, Utc};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, NoticeLevel, Screen};
use crate::block::BlockType;
use crate::chat::CHANNELS;
use crate::guides::GUIDES;
use crate::modal_ui::{
    draw_ai_panel, draw_block_editor_modal, draw_confirm_modal, draw_help_modal,
    draw_metadata_modal, draw_save_errors_modal, draw_template_view,
};
use crate::render::{self, Segment, SegmentKind, ViewMode};
use crate::template::Template;

/// Maximum length of a description in list rows.
pub const DESCRIPTION_MAX_LEN: usize = 60;

/// Truncates a string to the given maximum length, appending "..." if truncated.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    // Replace newlines with spaces for single-line display
    let single_line: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();

    if single_line.chars().count() <= max_len {
        single_line
    } else {
        let kept: String = single_line
            .chars()
            .take(max_len.saturating_sub(3))
            .collect();
        format!("{}...", kept)
    }
}

/// Shorten a path under the home directory to `~/...`.
pub fn contract_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(suffix) = path.strip_prefix(&home)
    {
        return format!("~/{}", suffix.display());
    }
    path.display().to_string()
}

/// Formats a stored timestamp as local `YYYY-MM-DD HH:MM`.
pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unsaved".to_string())
}

/// Calculate a centered rectangle within the given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

pub fn block_type_color(block_type: BlockType) -> Color {
    match block_type {
        BlockType::Text => Color::Blue,
        BlockType::Variable => Color::Magenta,
        BlockType::Choice => Color::Green,
        BlockType::Separator => Color::DarkGray,
    }
}

/// Styled lines for the rich preview. Line breaks start a new line.
pub fn preview_lines(segments: &[Segment]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    for segment in segments {
        let style = match segment.kind {
            SegmentKind::LineBreak => {
                lines.push(Line::from(std::mem::take(&mut spans)));
                continue;
            }
            SegmentKind::Text => Style::default(),
            SegmentKind::Variable => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            SegmentKind::Options => Style::default().fg(Color::Green),
        };
        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(segment.text.clone(), style));
    }
    lines.push(Line::from(spans));
    lines
}

/// `<name>: description` lines for variables that carry a description.
pub fn variable_hints(segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .filter_map(|s| s.hint.as_ref().map(|hint| format!("{}: {}", s.text, hint)))
        .collect()
}

/// Light markdown styling for guide bodies.
pub fn guide_lines(body: &str) -> Vec<Line<'static>> {
    body.lines()
        .map(|line| {
            if let Some(title) = line.strip_prefix("# ") {
                Line::from(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                ))
            } else if let Some(heading) = line.strip_prefix("## ") {
                Line::from(Span::styled(
                    heading.to_string(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
            } else if line.starts_with("    ") {
                Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Yellow),
                ))
            } else {
                Line::raw(line.replace("**", ""))
            }
        })
        .collect()
}

fn panel(title: impl Into<String>, focused: bool) -> Block<'static> {
    let color = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .title(Line::from(format!(" {} ", title.into())).left_aligned())
}

/// Draw the main UI.
pub fn draw_ui(f: &mut Frame, app: &mut App) {
    // Increment frame counter for animations
    app.frame_count = app.frame_count.wrapping_add(1);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Screen tabs
            Constraint::Min(0),    // Screen body
            Constraint::Length(3), // Shortcuts and notices
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);

    match app.screen {
        Screen::Builder => draw_builder(f, app, chunks[1]),
        Screen::Gallery => draw_gallery(f, app, chunks[1]),
        Screen::Profile => draw_profile(f, app, chunks[1]),
        Screen::Learn => draw_learn(f, app, chunks[1]),
        Screen::Chat => draw_chat(f, app, chunks[1]),
    }

    draw_footer(f, app, chunks[2]);

    if app.ai_panel.is_some() {
        draw_ai_panel(f, app);
    }
    if app.template_view.is_some() {
        draw_template_view(f, app);
    }
    if app.metadata_modal.is_some() {
        draw_metadata_modal(f, app);
    }
    if app.block_editor.is_some() {
        draw_block_editor_modal(f, app);
    }
    if app.show_help {
        draw_help_modal(f, app);
    }
    if app.save_errors.is_some() {
        draw_save_errors_modal(f, app);
    }
    if app.confirm.is_some() {
        draw_confirm_modal(f, app);
    }
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| Line::from(format!("F{} {}", i + 1, s.label())))
        .collect();
    let selected = Screen::ALL.iter().position(|s| *s == app.screen).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Cyan))
                .title(Line::from(" promptforge ").left_aligned())
                .title(Line::from(format!(" {} ", app.owner.display_name())).right_aligned()),
        )
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn draw_builder(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let template = app.editor.template();
    let title = if template.title.is_empty() {
        "Untitled".to_string()
    } else {
        template.title.clone()
    };
    let marker = if app.editor.has_unsaved_changes() { " ●" } else { "" };

    let items: Vec<ListItem> = template
        .blocks
        .iter()
        .map(|block| {
            let block_type = block.block_type();
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<9}", block_type.label()),
                    Style::default().fg(block_type_color(block_type)),
                ),
                Span::raw(truncate_str(&block.summary(), DESCRIPTION_MAX_LEN)),
            ]))
        })
        .collect();

    let mut blocks_panel = panel(format!("{}{}", title, marker), true);
    if template.blocks.is_empty() {
        blocks_panel = blocks_panel.title_bottom(
            Line::from(" t text  v variable  o options  - separator ").left_aligned(),
        );
    } else {
        let mut history = Vec::new();
        if app.editor.can_undo() {
            history.push("^z undo");
        }
        if app.editor.can_redo() {
            history.push("^y redo");
        }
        let footer = if history.is_empty() {
            format!(" {} blocks ", template.blocks.len())
        } else {
            format!(" {} blocks · {} ", template.blocks.len(), history.join("  "))
        };
        blocks_panel = blocks_panel.title_bottom(Line::from(footer).left_aligned());
    }
    if !template.category.is_empty() {
        let categories: Vec<&str> = template.category.iter().map(|c| c.label()).collect();
        blocks_panel =
            blocks_panel.title_bottom(Line::from(format!(" {} ", categories.join(", "))).right_aligned());
    }

    let list = List::new(items)
        .block(blocks_panel)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");
    let mut state = ListState::default();
    if !template.blocks.is_empty() {
        state.select(Some(app.selected_block));
    }
    f.render_stateful_widget(list, columns[0], &mut state);

    draw_preview(f, app, columns[1]);
}

fn draw_preview(f: &mut Frame, app: &App, area: Rect) {
    let template = app.editor.template();

    let mut content: Vec<Line> = match app.view_mode {
        ViewMode::Preview => {
            let segments = render::preview(template);
            let mut lines = preview_lines(&segments);
            let hints = variable_hints(&segments);
            if !hints.is_empty() {
                lines.push(Line::raw(""));
                lines.push(Line::from(Span::styled(
                    "Variables",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
                )));
                lines.extend(hints.into_iter().map(|h| {
                    Line::from(Span::styled(format!("  {}", h), Style::default().fg(Color::DarkGray)))
                }));
            }
            lines
        }
        ViewMode::Code => render::code_view(template)
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Yellow))))
            .collect(),
        ViewMode::Raw => render::plain_text(template)
            .lines()
            .map(|l| Line::raw(l.to_string()))
            .collect(),
    };
    if template.blocks.is_empty() {
        content = vec![Line::from(Span::styled(
            "Add blocks to see the prompt take shape.",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let modes = [ViewMode::Preview, ViewMode::Code, ViewMode::Raw]
        .iter()
        .map(|m| {
            if *m == app.view_mode {
                format!("[{}]", m.label())
            } else {
                m.label().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut block = panel(modes, false);
    if !template.description.is_empty() {
        block = block.title_bottom(
            Line::from(format!(" {} ", truncate_str(&template.description, DESCRIPTION_MAX_LEN)))
                .left_aligned(),
        );
    }

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.preview_scroll, 0));
    f.render_widget(paragraph, area);
}

fn template_row(template: &Template, show_author: bool) -> ListItem<'static> {
    let categories: Vec<&str> = template.category.iter().map(|c| c.label()).collect();
    let mut header = vec![Span::styled(
        template.title.clone(),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];
    if show_author {
        let author = template
            .user_name
            .clone()
            .or_else(|| template.user_id.clone())
            .unwrap_or_default();
        header.push(Span::styled(
            format!("  by {}", author),
            Style::default().fg(Color::DarkGray),
        ));
    }
    header.push(Span::styled(
        format!("  {}", format_timestamp(template.created_at)),
        Style::default().fg(Color::DarkGray),
    ));

    let tags = template
        .tags
        .iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ");
    ListItem::new(vec![
        Line::from(header),
        Line::from(Span::raw(format!(
            "  {}",
            truncate_str(&template.description, DESCRIPTION_MAX_LEN)
        ))),
        Line::from(vec![
            Span::styled(format!("  {}", categories.join(", ")), Style::default().fg(Color::Green)),
            Span::styled(format!("  {}", tags), Style::default().fg(Color::Cyan)),
        ]),
    ])
}

fn draw_template_list(
    f: &mut Frame,
    area: Rect,
    block: Block<'static>,
    templates: &[Template],
    selected: usize,
    show_author: bool,
    empty_text: &str,
) {
    if templates.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            empty_text.to_string(),
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = templates
        .iter()
        .map(|t| template_row(t, show_author))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut state = ListState::default();
    state.select(Some(selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_gallery(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let query = &app.gallery_query;
    let category = query.category.map(|c| c.label()).unwrap_or("All");
    let search_style = if app.gallery_searching {
        Style::default().fg(Color::Black).bg(Color::White)
    } else {
        Style::default().fg(Color::White)
    };
    let filter_line = Line::from(vec![
        Span::styled("Search: ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{} ", query.search), search_style),
        Span::styled("  Category: ", Style::default().fg(Color::DarkGray)),
        Span::styled(category, Style::default().fg(Color::Green)),
        Span::styled("  Sort: ", Style::default().fg(Color::DarkGray)),
        Span::styled(query.sort.label(), Style::default().fg(Color::Cyan)),
    ]);
    f.render_widget(
        Paragraph::new(filter_line).block(panel("Filters", app.gallery_searching)),
        chunks[0],
    );

    let block = panel(format!("Gallery ({})", app.gallery.len()), !app.gallery_searching);
    draw_template_list(
        f,
        chunks[1],
        block,
        &app.gallery,
        app.gallery_selected,
        true,
        "No prompts match these filters.",
    );
}

fn draw_profile(f: &mut Frame, app: &App, area: Rect) {
    let mut title = format!("My Prompts ({})", app.profile.len());
    if let Some(email) = &app.owner.email {
        title = format!("{} · {}", title, email);
    }
    draw_template_list(
        f,
        area,
        panel(title, true),
        &app.profile,
        app.profile_selected,
        false,
        "You have not saved any prompts yet. Press n to start one.",
    );
}

fn draw_learn(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(0)])
        .split(area);

    let items: Vec<ListItem> = GUIDES
        .iter()
        .map(|g| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    g.title,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("  {}", truncate_str(g.summary, 28)),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();
    let list = List::new(items)
        .block(panel("Guides", true))
        .highlight_style(Style::default().fg(Color::Cyan))
        .highlight_symbol("▶ ");
    let mut state = ListState::default();
    state.select(Some(app.guide_selected));
    f.render_stateful_widget(list, columns[0], &mut state);

    if let Some(guide) = GUIDES.get(app.guide_selected) {
        let body = Paragraph::new(guide_lines(guide.body))
            .block(panel(guide.sections.join(" · "), false))
            .wrap(Wrap { trim: false })
            .scroll((app.guide_scroll, 0));
        f.render_widget(body, columns[1]);
    }
}

fn draw_chat(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let channel_spans: Vec<Span> = CHANNELS
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            let style = if i == app.chat_channel {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            [Span::styled(format!(" #{} ", c.id), style), Span::raw(" ")]
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(channel_spans)), chunks[0]);

    let mut lines: Vec<Line> = Vec::new();
    for message in &app.chat_messages {
        let author_style = if message.author_id == app.owner.user_id {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(vec![
            Span::styled(message.author_name.clone(), author_style),
            Span::styled(
                format!("  {}", format_timestamp(Some(message.created_at))),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.push(Line::raw(message.text.clone()));
        lines.push(Line::raw(""));
    }

    let description = CHANNELS
        .get(app.chat_channel)
        .map(|c| format!("{} · {}", c.name, c.description))
        .unwrap_or_default();
    let messages_area = chunks[1];
    let visible = messages_area.height.saturating_sub(2) as usize;
    // Stick to the newest messages
    let scroll = lines.len().saturating_sub(visible) as u16;
    let paragraph = Paragraph::new(lines)
        .block(panel(description, false))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, messages_area);

    let (before, at, after) = app.chat_input.split_at_cursor();
    let input_line = Line::from(vec![
        Span::raw(before.to_string()),
        Span::styled(
            at.map(String::from).unwrap_or_else(|| " ".to_string()),
            Style::default().fg(Color::Black).bg(Color::White),
        ),
        Span::raw(after.to_string()),
    ]);
    f.render_widget(
        Paragraph::new(input_line).block(panel("Message (use #tags)", true)),
        chunks[2],
    );
}

fn shortcuts(app: &App) -> &'static str {
    match app.screen {
        Screen::Builder => {
            "[t/v/o/-] Add  [e] Edit  [d] Del  [J/K] Move  [m] Info  [s] Save  [a] AI  [Tab] View  [?] Help"
        }
        Screen::Gallery if app.gallery_searching => "[Enter] Done  [Esc] Done",
        Screen::Gallery => "[/] Search  [c] Category  [o] Sort  [Enter] View  [e] Edit  [Esc] Reset",
        Screen::Profile => "[Enter] Edit  [d] Delete  [n] New  [q] Quit",
        Screen::Learn => "[j/k] Guide  [PgUp/PgDn] Scroll  [q] Quit",
        Screen::Chat => "[Enter] Send  [Tab] Channel  [Ctrl+Q] Quit",
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let left = shortcuts(app);

    let (status_text, status_color) = match &app.notice {
        Some(notice) => (
            notice.text.clone(),
            match notice.level {
                NoticeLevel::Info => Color::Green,
                NoticeLevel::Warning => Color::Yellow,
                NoticeLevel::Error => Color::Red,
            },
        ),
        None => {
            let loading = app.suggestions_loading || app.examples_loading;
            match app.ai.service().quota_status() {
                Ok(quota) => {
                    let color = if quota.remaining == 0 {
                        Color::Red
                    } else if quota.remaining * 5 <= quota.limit {
                        Color::Yellow
                    } else {
                        Color::Cyan
                    };
                    let spinner = if loading {
                        ["◐ ", "◓ ", "◑ ", "◒ "][(app.frame_count / 4 % 4) as usize]
                    } else {
                        "● "
                    };
                    (format!("{}AI {}/{}", spinner, quota.used, quota.limit), color)
                }
                Err(_) => ("● AI unavailable".to_string(), Color::DarkGray),
            }
        }
    };

    // Calculate spacing to right-align the status indicator
    let inner_width = area.width.saturating_sub(2) as usize;
    let status_len = status_text.width();
    let left = truncate_str(left, inner_width.saturating_sub(status_len + 1));
    let spacing = inner_width.saturating_sub(left.width() + status_len);

    let line = Line::from(vec![
        Span::styled(left, Style::default().fg(Color::DarkGray)),
        Span::raw(" ".repeat(spacing)),
        Span::styled(status_text, Style::default().fg(status_color)),
    ]);
    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_str_short_string_unchanged() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_str_adds_ellipsis() {
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_str_replaces_newlines() {
        assert_eq!(truncate_str("a\nb", 10), "a b");
    }

    #[test]
    fn test_truncate_str_multibyte() {
        assert_eq!(truncate_str("ñañañañaña", 5), "ña...");
    }

    #[test]
    fn test_contract_path_uses_tilde_under_home() {
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".config").join("promptforge");
            assert_eq!(contract_path(&path), "~/.config/promptforge");
        }
        assert_eq!(contract_path(Path::new("/tmp/x.log")), "/tmp/x.log");
    }

    #[test]
    fn test_centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered_rect(20, 4, area), Rect::new(10, 3, 20, 4));
        assert_eq!(centered_rect(80, 20, area), Rect::new(0, 0, 40, 10));
    }

    #[test]
    fn test_format_timestamp_unsaved() {
        assert_eq!(format_timestamp(None), "unsaved");
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(Some(at)).len(), "2026-01-02 03:04".len());
    }

    fn preview_of(blocks: Vec<Block>) -> Vec<Segment> {
        let mut t = Template::new();
        t.blocks = blocks;
        render::preview(&t)
    }

    #[test]
    fn test_preview_lines_break_on_separator() {
        let segments = preview_of(vec![
            Block::text("Write about"),
            Block::variable("topic", Some("What to write about".to_string())),
            Block::separator(),
            Block::choice("", vec!["short".to_string(), "long".to_string()]),
        ]);
        let lines = preview_lines(&segments);
        assert_eq!(lines.len(), 2);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(first, "Write about <topic>");
        let second: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(second, "[short|long]");
    }

    #[test]
    fn test_variable_hints_only_described_variables() {
        let segments = preview_of(vec![
            Block::variable("topic", Some("Subject".to_string())),
            Block::variable("tone", None),
        ]);
        assert_eq!(variable_hints(&segments), vec!["<topic>: Subject".to_string()]);
    }

    #[test]
    fn test_guide_lines_strip_markup() {
        let lines = guide_lines("# Title\n## Part\n1. **Bold** text");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].spans[0].content, "Title");
        assert_eq!(lines[2].spans[0].content, "1. Bold text");
    }
}
