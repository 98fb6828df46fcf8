//! Prompt templates: an ordered list of blocks plus metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block::{Block, new_id};

/// Fixed category vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Text Generation")]
    TextGeneration,
    Analysis,
    Creativity,
    Programming,
    Education,
    Marketing,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::TextGeneration,
        Category::Analysis,
        Category::Creativity,
        Category::Programming,
        Category::Education,
        Category::Marketing,
        Category::Other,
    ];

    /// Label as stored in documents.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TextGeneration => "Text Generation",
            Self::Analysis => "Analysis",
            Self::Creativity => "Creativity",
            Self::Programming => "Programming",
            Self::Education => "Education",
            Self::Marketing => "Marketing",
            Self::Other => "Other",
        }
    }

    /// Parse a label, case-insensitively. Accepts `text-generation` style too.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().replace(['-', '_'], " ").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.label().to_lowercase() == normalized)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tags offered by the metadata editor.
pub const SUGGESTED_TAGS: &[&str] = &[
    "AI",
    "GPT",
    "Writing",
    "Analysis",
    "Code",
    "Education",
    "Marketing",
    "SEO",
    "Creativity",
    "Productivity",
];

/// Owner used when a template is created without attribution.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Denormalized owner attribution, taken from the session at save time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Owner {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Owner {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            name: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.user_id)
    }
}

/// A user-authored prompt template, the unit of persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub category: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// Empty template with a random client-side id.
    pub fn new() -> Self {
        Self {
            id: new_id(),
            title: String::new(),
            description: String::new(),
            blocks: Vec::new(),
            category: Vec::new(),
            tags: Vec::new(),
            user_id: None,
            user_email: None,
            user_name: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Whether the given user owns this template.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    /// Stamp owner attribution from the session.
    pub fn set_owner(&mut self, owner: &Owner) {
        self.user_id = Some(owner.user_id.clone());
        self.user_email = owner.email.clone();
        self.user_name = owner.name.clone();
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.category.contains(&category)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Full-field patch, used when saving an already persisted template.
    pub fn to_patch(&self) -> TemplatePatch {
        TemplatePatch {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            blocks: Some(self.blocks.clone()),
            category: Some(self.category.clone()),
            tags: Some(self.tags.clone()),
        }
    }

    /// Shallow-merge the supplied fields.
    pub fn apply(&mut self, patch: TemplatePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(blocks) = patch.blocks {
            self.blocks = blocks;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
    }
}

/// Partial metadata update. Fields that are `None` are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplatePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub blocks: Option<Vec<Block>>,
    pub category: Option<Vec<Category>>,
    pub tags: Option<Vec<String>>,
}

impl TemplatePatch {
    #[cfg(test)]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Some(blocks),
            ..Default::default()
        }
    }

    pub fn category(category: Vec<Category>) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            tags: Some(tags),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &TemplatePatch::default()
    }
}

/// Add a tag, trimming it and skipping blanks and duplicates.
/// Returns true if the list changed.
pub fn insert_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let tag = tag.trim();
    if tag.is_empty() || tags.iter().any(|t| t == tag) {
        return false;
    }
    tags.push(tag.to_string());
    true
}

/// Add the category if absent, remove it if present.
pub fn toggle_category(categories: &mut Vec<Category>, category: Category) {
    if let Some(pos) = categories.iter().position(|c| *c == category) {
        categories.remove(pos);
    } else {
        categories.push(category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_template_is_empty() {
        let t = Template::new();
        assert!(!t.id.is_empty());
        assert!(t.title.is_empty());
        assert!(t.blocks.is_empty());
        assert!(t.category.is_empty());
        assert!(t.user_id.is_none());
    }

    #[test]
    fn test_category_labels_round_trip_through_parse() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.label()), Some(category));
        }
        assert_eq!(
            Category::parse("text-generation"),
            Some(Category::TextGeneration)
        );
        assert_eq!(Category::parse("nonsense"), None);
    }

    #[test]
    fn test_document_uses_camel_case_and_labels() {
        let mut t = Template::new();
        t.category = vec![Category::TextGeneration];
        t.set_owner(&Owner {
            user_id: "u1".to_string(),
            email: Some("u1@example.com".to_string()),
            name: None,
        });
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["userEmail"], "u1@example.com");
        assert!(json.get("userName").is_none());
        assert_eq!(json["category"][0], "Text Generation");
    }

    #[test]
    fn test_apply_patch_is_shallow() {
        let mut t = Template::new();
        t.title = "Old".to_string();
        t.description = "Keep me".to_string();
        t.apply(TemplatePatch::title("New"));
        assert_eq!(t.title, "New");
        assert_eq!(t.description, "Keep me");
    }

    #[test]
    fn test_insert_tag_dedupes_and_trims() {
        let mut tags = vec![];
        assert!(insert_tag(&mut tags, " SEO "));
        assert!(!insert_tag(&mut tags, "SEO"));
        assert!(!insert_tag(&mut tags, "   "));
        assert!(insert_tag(&mut tags, "Code"));
        assert_eq!(tags, vec!["SEO".to_string(), "Code".to_string()]);
    }

    #[test]
    fn test_toggle_category() {
        let mut categories = vec![];
        toggle_category(&mut categories, Category::Analysis);
        toggle_category(&mut categories, Category::Marketing);
        assert_eq!(categories, vec![Category::Analysis, Category::Marketing]);
        toggle_category(&mut categories, Category::Analysis);
        assert_eq!(categories, vec![Category::Marketing]);
    }

    #[test]
    fn test_empty_patch() {
        assert!(TemplatePatch::default().is_empty());
        assert!(!TemplatePatch::tags(vec![]).is_empty());
    }
}
