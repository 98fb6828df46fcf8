//! Editor state controller: owns the single template being edited.

use tracing::{debug, info, warn};

use crate::block::Block;
use crate::error::{PromptError, Result};
use crate::store::Database;
use crate::template::{Category, Owner, Template, TemplatePatch, insert_tag, toggle_category};
use crate::validators::validate_template;

/// Maximum number of undo snapshots kept.
const HISTORY_LIMIT: usize = 50;

/// Direction for moving a block one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
}

/// In-memory editing session for one template.
#[derive(Debug, Clone)]
pub struct Editor {
    template: Template,
    /// Store id once the template has been saved or loaded.
    persisted_id: Option<String>,
    /// Set by every mutation, cleared by a successful save.
    dirty: bool,
    undo_stack: Vec<Template>,
    redo_stack: Vec<Template>,
    /// Incremented on every mutation; lets async results detect staleness.
    revision: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Fresh, empty template.
    pub fn new() -> Self {
        Self {
            template: Template::new(),
            persisted_id: None,
            dirty: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            revision: 0,
        }
    }

    /// Start editing a template that already exists in the store.
    pub fn from_persisted(template: Template) -> Self {
        Self {
            persisted_id: Some(template.id.clone()),
            template,
            ..Self::new()
        }
    }

    /// Load a stored template for editing, refusing templates owned by someone else.
    pub fn open(db: &Database, id: &str, owner: &Owner) -> Result<Self> {
        let template = db
            .get_by_id(id)?
            .ok_or_else(|| PromptError::NotFound(format!("prompt {}", id)))?;
        if !template.is_owned_by(&owner.user_id) {
            warn!(id, user = %owner.user_id, "edit_forbidden");
            return Err(PromptError::Forbidden { id: id.to_string() });
        }
        debug!(id, "template_opened");
        Ok(Self::from_persisted(template))
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn persisted_id(&self) -> Option<&str> {
        self.persisted_id.as_deref()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Snapshot the current template before a mutation.
    fn record(&mut self) {
        self.undo_stack.push(self.template.clone());
        if self.undo_stack.len() > HISTORY_LIMIT {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    /// Append a block to the end of the template.
    pub fn add_block(&mut self, block: Block) {
        self.record();
        self.template.blocks.push(block);
        self.touch();
    }

    /// Replace the block with the given id. Returns false if nothing changed.
    ///
    /// A block's type is fixed at creation, so a replacement of another type is refused.
    pub fn update_block(&mut self, id: &str, block: Block) -> bool {
        let Some(pos) = self.template.blocks.iter().position(|b| b.id == id) else {
            return false;
        };
        if self.template.blocks[pos].block_type() != block.block_type() {
            warn!(id, "block_type_change_refused");
            return false;
        }
        self.record();
        self.template.blocks[pos] = Block {
            id: id.to_string(),
            kind: block.kind,
        };
        self.touch();
        true
    }

    /// Replace the whole block sequence. Used for deletion and reordering.
    pub fn reorder_blocks(&mut self, blocks: Vec<Block>) {
        self.record();
        self.template.blocks = blocks;
        self.touch();
    }

    /// Shallow-merge metadata fields into the template. A patch that leaves
    /// every field as it was is ignored.
    pub fn update_metadata(&mut self, patch: TemplatePatch) {
        if patch.is_empty() {
            return;
        }
        let mut updated = self.template.clone();
        updated.apply(patch);
        if updated == self.template {
            return;
        }
        self.record();
        self.template = updated;
        self.touch();
    }

    /// Remove a block by id.
    pub fn remove_block(&mut self, id: &str) -> bool {
        if !self.template.blocks.iter().any(|b| b.id == id) {
            return false;
        }
        let remaining = self
            .template
            .blocks
            .iter()
            .filter(|b| b.id != id)
            .cloned()
            .collect();
        self.reorder_blocks(remaining);
        true
    }

    /// Move a block one slot. Returns its new index, or None if it could not move.
    pub fn move_block(&mut self, id: &str, direction: Move) -> Option<usize> {
        let pos = self.template.blocks.iter().position(|b| b.id == id)?;
        let target = match direction {
            Move::Up => pos.checked_sub(1)?,
            Move::Down if pos + 1 < self.template.blocks.len() => pos + 1,
            Move::Down => return None,
        };
        let mut blocks = self.template.blocks.clone();
        blocks.swap(pos, target);
        self.reorder_blocks(blocks);
        Some(target)
    }

    pub fn toggle_category(&mut self, category: Category) {
        let mut categories = self.template.category.clone();
        toggle_category(&mut categories, category);
        self.update_metadata(TemplatePatch::category(categories));
    }

    /// Add a tag. Duplicates and blank tags are ignored.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let mut tags = self.template.tags.clone();
        if !insert_tag(&mut tags, tag) {
            return false;
        }
        self.update_metadata(TemplatePatch::tags(tags));
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        if !self.template.has_tag(tag) {
            return false;
        }
        let tags = self
            .template
            .tags
            .iter()
            .filter(|t| *t != tag)
            .cloned()
            .collect();
        self.update_metadata(TemplatePatch::tags(tags));
        true
    }

    /// Append an accepted AI suggestion as a new text block.
    pub fn apply_suggestion(&mut self, text: &str) {
        self.add_block(Block::text(text.trim()));
    }

    /// Every reason the template cannot be saved yet, all at once.
    pub fn validate(&self) -> Vec<String> {
        validate_template(&self.template)
    }

    /// Restore the template from a snapshot, keeping identity and attribution.
    fn restore(&mut self, mut snapshot: Template) -> Template {
        snapshot.id = self.template.id.clone();
        snapshot.user_id = self.template.user_id.clone();
        snapshot.user_email = self.template.user_email.clone();
        snapshot.user_name = self.template.user_name.clone();
        snapshot.created_at = self.template.created_at;
        snapshot.updated_at = self.template.updated_at;
        let previous = std::mem::replace(&mut self.template, snapshot);
        self.touch();
        previous
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let previous = self.restore(snapshot);
        self.redo_stack.push(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let previous = self.restore(snapshot);
        self.undo_stack.push(previous);
        true
    }

    /// Validate and persist. Creates on first save, updates afterwards.
    ///
    /// Returns the store id. On success the unsaved-changes flag is cleared.
    pub fn save(&mut self, db: &Database, owner: &Owner) -> Result<String> {
        let errors = self.validate();
        if !errors.is_empty() {
            debug!(count = errors.len(), "save_validation_failed");
            return Err(PromptError::Validation(errors));
        }

        let id = match &self.persisted_id {
            Some(id) => {
                db.update(id, &self.template.to_patch(), owner)?;
                id.clone()
            }
            None => db.create(&self.template, Some(owner))?,
        };

        // Pick up store-assigned id, timestamps and attribution
        if let Some(stored) = db.get_by_id(&id)? {
            self.template = stored;
        }
        self.persisted_id = Some(id.clone());
        self.dirty = false;
        info!(id = %id, blocks = self.template.blocks.len(), "template_saved");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;
    use std::sync::Arc;

    use crate::clock::SystemClock;

    fn db() -> Database {
        Database::open_in_memory(Arc::new(SystemClock)).unwrap()
    }

    fn filled_editor() -> Editor {
        let mut editor = Editor::new();
        editor.update_metadata(TemplatePatch {
            title: Some("Summarizer".into()),
            description: Some("Summarizes a topic".into()),
            ..Default::default()
        });
        editor.add_block(Block::text("Summarize"));
        editor.toggle_category(Category::TextGeneration);
        editor
    }

    #[test]
    fn test_new_editor_is_clean() {
        let editor = Editor::new();
        assert!(!editor.has_unsaved_changes());
        assert!(editor.persisted_id().is_none());
    }

    #[test]
    fn test_add_block_appends_and_marks_dirty() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("one"));
        editor.add_block(Block::text("two"));
        assert!(editor.has_unsaved_changes());
        let contents: Vec<_> = editor.template().blocks.iter().map(|b| b.content()).collect();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[test]
    fn test_add_twice_then_drop_first_keeps_second_id() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("first"));
        editor.add_block(Block::variable("second", None));
        let before = editor.template().blocks.len();
        let second_id = editor.template().blocks[1].id.clone();

        let remaining: Vec<Block> = editor.template().blocks[1..].to_vec();
        editor.reorder_blocks(remaining);

        assert_eq!(editor.template().blocks.len(), before - 1);
        assert_eq!(editor.template().blocks[0].id, second_id);
    }

    #[test]
    fn test_reorder_then_inverse_restores_original() {
        let mut editor = Editor::new();
        for word in ["a", "b", "c", "d"] {
            editor.add_block(Block::text(word));
        }
        let original = editor.template().blocks.clone();

        let permutation = [2usize, 0, 3, 1];
        let permuted: Vec<Block> = permutation.iter().map(|&i| original[i].clone()).collect();
        editor.reorder_blocks(permuted.clone());
        assert_ne!(editor.template().blocks, original);

        let mut inverse = vec![0usize; permutation.len()];
        for (new_pos, &old_pos) in permutation.iter().enumerate() {
            inverse[old_pos] = new_pos;
        }
        let restored: Vec<Block> = inverse.iter().map(|&i| permuted[i].clone()).collect();
        editor.reorder_blocks(restored);
        assert_eq!(editor.template().blocks, original);
    }

    #[test]
    fn test_update_block_replaces_matching_id() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("draft"));
        let id = editor.template().blocks[0].id.clone();

        assert!(editor.update_block(&id, Block::text("final")));
        assert_eq!(editor.template().blocks[0].content(), "final");
        assert_eq!(editor.template().blocks[0].id, id);
    }

    #[test]
    fn test_update_block_missing_id_is_noop() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("draft"));
        let revision = editor.revision();
        assert!(!editor.update_block("missing", Block::text("x")));
        assert_eq!(editor.revision(), revision);
        assert_eq!(editor.template().blocks[0].content(), "draft");
    }

    #[test]
    fn test_update_block_refuses_type_change() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("draft"));
        let id = editor.template().blocks[0].id.clone();
        assert!(!editor.update_block(&id, Block::variable("name", None)));
        assert_eq!(editor.template().blocks[0].block_type(), BlockType::Text);
    }

    #[test]
    fn test_update_metadata_shallow_merge() {
        let mut editor = Editor::new();
        editor.update_metadata(TemplatePatch::title("T"));
        editor.update_metadata(TemplatePatch::description("D"));
        assert_eq!(editor.template().title, "T");
        assert_eq!(editor.template().description, "D");
    }

    #[test]
    fn test_unchanged_metadata_leaves_editor_clean() {
        let mut template = Template::new();
        template.title = "Summary".to_string();
        template.blocks.push(Block::text("Summarize"));
        let mut editor = Editor::from_persisted(template);

        editor.update_metadata(editor.template().to_patch());
        assert!(!editor.has_unsaved_changes());
        assert_eq!(editor.revision(), 0);
        assert!(!editor.can_undo());

        editor.update_metadata(TemplatePatch::title("Summary v2"));
        assert!(editor.has_unsaved_changes());
        assert_eq!(editor.revision(), 1);
    }

    #[test]
    fn test_validate_empty_template_reports_four_violations() {
        let editor = Editor::new();
        assert_eq!(editor.validate().len(), 4);
    }

    #[test]
    fn test_validate_whitespace_title_counts_as_missing() {
        let mut editor = filled_editor();
        editor.update_metadata(TemplatePatch::title("   "));
        assert_eq!(editor.validate(), vec!["Title is required".to_string()]);
    }

    #[test]
    fn test_validate_filled_template_is_clean() {
        assert!(filled_editor().validate().is_empty());
    }

    #[test]
    fn test_move_block() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("a"));
        editor.add_block(Block::text("b"));
        let a = editor.template().blocks[0].id.clone();

        assert_eq!(editor.move_block(&a, Move::Up), None);
        assert_eq!(editor.move_block(&a, Move::Down), Some(1));
        assert_eq!(editor.template().blocks[1].id, a);
        assert_eq!(editor.move_block(&a, Move::Down), None);
    }

    #[test]
    fn test_remove_block() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("a"));
        let id = editor.template().blocks[0].id.clone();
        assert!(editor.remove_block(&id));
        assert!(editor.template().blocks.is_empty());
        assert!(!editor.remove_block(&id));
    }

    #[test]
    fn test_tags_dedupe_on_insert() {
        let mut editor = Editor::new();
        assert!(editor.add_tag("SEO"));
        assert!(!editor.add_tag("SEO"));
        assert!(editor.remove_tag("SEO"));
        assert!(!editor.remove_tag("SEO"));
        assert!(editor.template().tags.is_empty());
    }

    #[test]
    fn test_toggle_category_twice_removes_it() {
        let mut editor = Editor::new();
        editor.toggle_category(Category::Marketing);
        assert!(editor.template().has_category(Category::Marketing));
        editor.toggle_category(Category::Marketing);
        assert!(editor.template().category.is_empty());
    }

    #[test]
    fn test_apply_suggestion_adds_text_block() {
        let mut editor = Editor::new();
        editor.apply_suggestion("  Be concise.  ");
        let block = &editor.template().blocks[0];
        assert_eq!(block.block_type(), BlockType::Text);
        assert_eq!(block.content(), "Be concise.");
    }

    #[test]
    fn test_undo_redo() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("a"));
        editor.add_block(Block::text("b"));
        assert!(editor.undo());
        assert_eq!(editor.template().blocks.len(), 1);
        assert!(editor.redo());
        assert_eq!(editor.template().blocks.len(), 2);
        assert!(!editor.redo());
    }

    #[test]
    fn test_new_mutation_clears_redo() {
        let mut editor = Editor::new();
        editor.add_block(Block::text("a"));
        editor.undo();
        editor.add_block(Block::text("b"));
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_save_rejects_invalid_template_with_all_errors() {
        let db = db();
        let mut editor = Editor::new();
        let err = editor.save(&db, &Owner::new("u1")).unwrap_err();
        match err {
            PromptError::Validation(errors) => assert_eq!(errors.len(), 4),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(db.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_then_updates() {
        let db = db();
        let owner = Owner::new("u1");
        let mut editor = filled_editor();

        let id = editor.save(&db, &owner).unwrap();
        assert!(!editor.has_unsaved_changes());
        assert_eq!(editor.persisted_id(), Some(id.as_str()));
        assert_eq!(editor.template().user_id.as_deref(), Some("u1"));
        assert!(editor.template().created_at.is_some());

        editor.update_metadata(TemplatePatch::title("Renamed"));
        assert!(editor.has_unsaved_changes());
        let second = editor.save(&db, &owner).unwrap();
        assert_eq!(second, id);
        assert_eq!(db.get_all().unwrap().len(), 1);
        assert_eq!(db.get_by_id(&id).unwrap().unwrap().title, "Renamed");
    }

    #[test]
    fn test_open_refuses_other_owner() {
        let db = db();
        let mut editor = filled_editor();
        let id = editor.save(&db, &Owner::new("u1")).unwrap();

        assert!(matches!(
            Editor::open(&db, &id, &Owner::new("u2")),
            Err(PromptError::Forbidden { .. })
        ));
        assert!(matches!(
            Editor::open(&db, "missing", &Owner::new("u1")),
            Err(PromptError::NotFound(_))
        ));
        let opened = Editor::open(&db, &id, &Owner::new("u1")).unwrap();
        assert!(!opened.has_unsaved_changes());
        assert_eq!(opened.template().title, "Summarizer");
    }
}
