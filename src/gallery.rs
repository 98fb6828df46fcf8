//! Search, filter and sort for template listings.

use std::cmp::Ordering;

use crate::template::{Category, Template};

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
}

impl SortOrder {
    pub fn next(self) -> Self {
        match self {
            Self::Newest => Self::Oldest,
            Self::Oldest => Self::Title,
            Self::Title => Self::Newest,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::Oldest => "Oldest",
            Self::Title => "Title",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "recent" => Some(Self::Newest),
            "oldest" => Some(Self::Oldest),
            "title" => Some(Self::Title),
            _ => None,
        }
    }
}

/// Gallery filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryQuery {
    pub search: String,
    pub category: Option<Category>,
    pub sort: SortOrder,
}

impl GalleryQuery {
    /// Whether a template passes the search and category filters.
    ///
    /// Search is case-insensitive over title, description and tags.
    pub fn matches(&self, template: &Template) -> bool {
        if let Some(category) = self.category
            && !template.has_category(category)
        {
            return false;
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        template.title.to_lowercase().contains(&needle)
            || template.description.to_lowercase().contains(&needle)
            || template
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&needle))
    }

    /// Cycle the category filter: all, then each category in order.
    pub fn cycle_category(&mut self) {
        self.category = match self.category {
            None => Category::ALL.first().copied(),
            Some(current) => Category::ALL
                .iter()
                .position(|c| *c == current)
                .and_then(|i| Category::ALL.get(i + 1).copied()),
        };
    }

    /// Filter and sort a listing. Input order is kept for equal keys.
    pub fn apply(&self, templates: &[Template]) -> Vec<Template> {
        let mut out: Vec<Template> = templates
            .iter()
            .filter(|t| self.matches(t))
            .cloned()
            .collect();
        match self.sort {
            // Stable sorts, so ties keep store order
            SortOrder::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Oldest => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Title => out.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        }
        out
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
