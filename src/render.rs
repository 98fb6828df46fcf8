//! Pure rendering of a template into its three presentation forms.

use crate::block::{Block, BlockKind};
use crate::template::Template;

/// Which rendered form the preview pane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Styled inline segments.
    #[default]
    Preview,
    /// JSON-like structural dump.
    Code,
    /// Interpolated plain text.
    Raw,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            Self::Preview => Self::Code,
            Self::Code => Self::Raw,
            Self::Raw => Self::Preview,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Preview => "Preview",
            Self::Code => "Code",
            Self::Raw => "Plain text",
        }
    }
}

/// Kind of a rich preview segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Variable,
    Options,
    LineBreak,
}

/// One styled inline element of the rich preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
    /// Hover text. Only variables with a description carry one.
    pub hint: Option<String>,
}

/// Token a block contributes to the plain-text form. `None` for separators.
fn token(block: &Block) -> Option<String> {
    match &block.kind {
        BlockKind::Text { content } => Some(content.clone()),
        BlockKind::Variable { content, .. } => Some(format!("<{}>", content)),
        BlockKind::Choice { options, .. } => Some(format!("[{}]", options.join("|"))),
        BlockKind::Separator { .. } => None,
    }
}

/// Interpolated plain text: tokens joined with single spaces, separators as newlines.
pub fn plain_text(template: &Template) -> String {
    let mut out = String::new();
    let mut need_space = false;
    for block in &template.blocks {
        match token(block) {
            Some(tok) => {
                if need_space {
                    out.push(' ');
                }
                out.push_str(&tok);
                need_space = true;
            }
            None => {
                out.push('\n');
                need_space = false;
            }
        }
    }
    out
}

/// File name for a plain-text export, derived from the title.
pub fn export_file_name(template: &Template) -> String {
    let slug = template
        .title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "prompt.txt".to_string()
    } else {
        format!("{}.txt", slug)
    }
}

/// Indent every line after the first by `indent`.
fn indent_tail(s: &str, indent: &str) -> String {
    s.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Structural dump of the template, blocks pretty-printed individually.
pub fn code_view(template: &Template) -> String {
    let blocks = template
        .blocks
        .iter()
        .map(|b| {
            let pretty = serde_json::to_string_pretty(b).unwrap_or_default();
            indent_tail(&pretty, "    ")
        })
        .collect::<Vec<_>>()
        .join(",\n    ");
    let category = serde_json::to_string(&template.category).unwrap_or_else(|_| "[]".into());
    let tags = serde_json::to_string(&template.tags).unwrap_or_else(|_| "[]".into());

    format!(
        "{{\n  \"title\": {},\n  \"description\": {},\n  \"blocks\": [\n    {}\n  ],\n  \"category\": {},\n  \"tags\": {}\n}}",
        json_string(&template.title),
        json_string(&template.description),
        blocks,
        category,
        tags
    )
}

/// Rich preview segments in block order.
pub fn preview(template: &Template) -> Vec<Segment> {
    template
        .blocks
        .iter()
        .map(|block| match &block.kind {
            BlockKind::Text { content } => Segment {
                kind: SegmentKind::Text,
                text: content.clone(),
                hint: None,
            },
            BlockKind::Variable {
                content,
                description,
            } => Segment {
                kind: SegmentKind::Variable,
                text: format!("<{}>", content),
                hint: description.clone().filter(|d| !d.trim().is_empty()),
            },
            BlockKind::Choice { options, .. } => Segment {
                kind: SegmentKind::Options,
                text: format!("[{}]", options.join("|")),
                hint: None,
            },
            BlockKind::Separator { .. } => Segment {
                kind: SegmentKind::LineBreak,
                text: String::new(),
                hint: None,
            },
        })
        .collect()
}
