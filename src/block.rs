//! Prompt blocks: the typed units a template is assembled from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single typed unit of prompt content.
///
/// Serialized flat, with the kind as a `"type"` tag:
/// `{"id": "...", "type": "variable", "content": "topic", "description": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(flatten)]
    pub kind: BlockKind,
}

/// Block payload, discriminated by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockKind {
    /// Literal prompt text.
    Text {
        #[serde(default)]
        content: String,
    },
    /// A placeholder the user fills in; `content` is the variable name.
    Variable {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A group of alternatives; `content` is the group label.
    #[serde(rename = "option")]
    Choice {
        #[serde(default)]
        content: String,
        #[serde(default)]
        options: Vec<String>,
    },
    /// Line break. Content is kept for document compatibility but never rendered.
    Separator {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        content: String,
    },
}

/// Block type without payload, used by the palette and for kind checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Text,
    Variable,
    Choice,
    Separator,
}

impl BlockType {
    pub const ALL: [BlockType; 4] = [
        BlockType::Text,
        BlockType::Variable,
        BlockType::Choice,
        BlockType::Separator,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Variable => "Variable",
            Self::Choice => "Options",
            Self::Separator => "Separator",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Text => "Plain prompt text",
            Self::Variable => "A customizable placeholder",
            Self::Choice => "A list of selectable alternatives",
            Self::Separator => "A line break",
        }
    }

    /// Empty payload for a freshly created block of this type.
    fn empty_kind(self) -> BlockKind {
        match self {
            Self::Text => BlockKind::Text {
                content: String::new(),
            },
            Self::Variable => BlockKind::Variable {
                content: String::new(),
                description: None,
            },
            Self::Choice => BlockKind::Choice {
                content: String::new(),
                options: Vec::new(),
            },
            Self::Separator => BlockKind::Separator {
                content: String::new(),
            },
        }
    }
}

/// Generates a fresh opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Block {
    /// Empty block of the given type with a fresh id.
    pub fn new(block_type: BlockType) -> Self {
        Self {
            id: new_id(),
            kind: block_type.empty_kind(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind: BlockKind::Text {
                content: content.into(),
            },
        }
    }

    pub fn variable(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: new_id(),
            kind: BlockKind::Variable {
                content: name.into(),
                description,
            },
        }
    }

    #[cfg(test)]
    pub fn choice(label: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            id: new_id(),
            kind: BlockKind::Choice {
                content: label.into(),
                options,
            },
        }
    }

    pub fn separator() -> Self {
        Self::new(BlockType::Separator)
    }

    pub fn block_type(&self) -> BlockType {
        match self.kind {
            BlockKind::Text { .. } => BlockType::Text,
            BlockKind::Variable { .. } => BlockType::Variable,
            BlockKind::Choice { .. } => BlockType::Choice,
            BlockKind::Separator { .. } => BlockType::Separator,
        }
    }

    /// The free-form content field, whatever it means for this kind.
    pub fn content(&self) -> &str {
        match &self.kind {
            BlockKind::Text { content }
            | BlockKind::Variable { content, .. }
            | BlockKind::Choice { content, .. }
            | BlockKind::Separator { content } => content,
        }
    }

    /// One-line summary for lists.
    pub fn summary(&self) -> String {
        match &self.kind {
            BlockKind::Text { content } => content.clone(),
            BlockKind::Variable {
                content,
                description,
            } => match description.as_deref().filter(|d| !d.is_empty()) {
                Some(d) => format!("<{}> {}", content, d),
                None => format!("<{}>", content),
            },
            BlockKind::Choice { content, options } => {
                if content.is_empty() {
                    format!("[{}]", options.join("|"))
                } else {
                    format!("{}: [{}]", content, options.join("|"))
                }
            }
            BlockKind::Separator { .. } => "────".to_string(),
        }
    }
}
