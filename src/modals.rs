//! Modal dialog state and input handling.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyModifiers};
use tracing::debug;

use crate::app::{App, PendingAction};
use crate::block::{Block, BlockKind, BlockType, new_id};
use crate::suggest::Completion;
use crate::template::{Category, SUGGESTED_TAGS, Template, TemplatePatch, insert_tag, toggle_category};

/// Single-line text field with a character-based cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    /// Field holding `value` with the cursor at the end.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char_before(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let at = self.byte_index(self.cursor - 1);
        self.value.remove(at);
        self.cursor -= 1;
        true
    }

    /// Delete the character at the cursor (delete key).
    pub fn delete_char_at(&mut self) -> bool {
        if self.cursor >= self.char_count() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
        true
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.char_count();
    }

    pub fn set(&mut self, value: impl Into<String>) {
        *self = Self::new(value);
    }

    /// Empty the field, returning what it held.
    pub fn take(&mut self) -> String {
        let value = std::mem::take(&mut self.value);
        self.cursor = 0;
        value
    }

    /// Apply an editing key. Returns true if the value changed.
    pub fn handle_key(&mut self, key_code: KeyCode) -> bool {
        match key_code {
            KeyCode::Char(c) => {
                self.insert_char(c);
                true
            }
            KeyCode::Backspace => self.delete_char_before(),
            KeyCode::Delete => self.delete_char_at(),
            KeyCode::Left => {
                self.cursor_left();
                false
            }
            KeyCode::Right => {
                self.cursor_right();
                false
            }
            KeyCode::Home => {
                self.cursor_home();
                false
            }
            KeyCode::End => {
                self.cursor_end();
                false
            }
            _ => false,
        }
    }

    /// Text before the cursor, the character under it, and the rest.
    pub fn split_at_cursor(&self) -> (&str, Option<char>, &str) {
        let at = self.byte_index(self.cursor);
        let (before, rest) = self.value.split_at(at);
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) => (before, Some(c), chars.as_str()),
            None => (before, None, ""),
        }
    }
}

/// Split `a | b | c` into trimmed, non-empty options.
pub fn parse_options(s: &str) -> Vec<String> {
    s.split('|')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn format_options(options: &[String]) -> String {
    options.join(" | ")
}

/// Which field is focused in the block editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEditorField {
    Content,
    Description,
    Options,
    SaveButton,
    CancelButton,
}

impl BlockEditorField {
    /// Fields shown for a block type, in focus order.
    pub fn fields_for(block_type: BlockType) -> &'static [BlockEditorField] {
        use BlockEditorField::*;
        match block_type {
            BlockType::Text => &[Content, SaveButton, CancelButton],
            BlockType::Variable => &[Content, Description, SaveButton, CancelButton],
            BlockType::Choice => &[Content, Options, SaveButton, CancelButton],
            BlockType::Separator => &[SaveButton, CancelButton],
        }
    }

    pub fn label(self, block_type: BlockType) -> &'static str {
        match (self, block_type) {
            (Self::Content, BlockType::Variable) => "Name",
            (Self::Content, BlockType::Choice) => "Label",
            (Self::Content, _) => "Text",
            (Self::Description, _) => "Description",
            (Self::Options, _) => "Options",
            (Self::SaveButton, _) => "Save",
            (Self::CancelButton, _) => "Cancel",
        }
    }
}

/// State for the block editor modal.
#[derive(Debug, Clone)]
pub struct BlockEditorState {
    pub block_id: String,
    pub block_type: BlockType,
    /// The block is appended on save rather than replacing an existing one.
    pub is_new: bool,
    pub focus: BlockEditorField,
    pub content: TextInput,
    pub description: TextInput,
    /// Choice options as `a | b | c`.
    pub options: TextInput,
    pub completions: Vec<Completion>,
    pub completion_selected: Option<usize>,
    /// Time of the last keystroke not yet sent for autocomplete.
    pub autocomplete_pending_since: Option<Instant>,
    pub autocomplete_loading: bool,
}

impl BlockEditorState {
    fn blank(block_id: String, block_type: BlockType, is_new: bool) -> Self {
        let focus = BlockEditorField::fields_for(block_type)[0];
        Self {
            block_id,
            block_type,
            is_new,
            focus,
            content: TextInput::default(),
            description: TextInput::default(),
            options: TextInput::default(),
            completions: Vec::new(),
            completion_selected: None,
            autocomplete_pending_since: None,
            autocomplete_loading: false,
        }
    }

    pub fn new_block(block_type: BlockType) -> Self {
        Self::blank(new_id(), block_type, true)
    }

    pub fn edit(block: &Block) -> Self {
        let mut state = Self::blank(block.id.clone(), block.block_type(), false);
        state.content.set(block.content());
        match &block.kind {
            BlockKind::Variable {
                description: Some(d),
                ..
            } => state.description.set(d.clone()),
            BlockKind::Choice { options, .. } => state.options.set(format_options(options)),
            _ => {}
        }
        state
    }

    fn focus_step(&mut self, forward: bool) {
        let fields = BlockEditorField::fields_for(self.block_type);
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % fields.len()
        } else {
            (pos + fields.len() - 1) % fields.len()
        };
        self.focus = fields[next];
    }

    pub fn focus_next(&mut self) {
        self.focus_step(true);
    }

    pub fn focus_prev(&mut self) {
        self.focus_step(false);
    }

    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            BlockEditorField::Content => Some(&mut self.content),
            BlockEditorField::Description => Some(&mut self.description),
            BlockEditorField::Options => Some(&mut self.options),
            _ => None,
        }
    }

    /// Autocomplete only runs on the text of text blocks.
    pub fn autocompletes(&self) -> bool {
        self.block_type == BlockType::Text && self.focus == BlockEditorField::Content
    }

    pub fn to_block(&self) -> Block {
        let content = self.content.value().to_string();
        let kind = match self.block_type {
            BlockType::Text => BlockKind::Text { content },
            BlockType::Variable => BlockKind::Variable {
                content: content.trim().to_string(),
                description: Some(self.description.value().trim().to_string())
                    .filter(|d| !d.is_empty()),
            },
            BlockType::Choice => BlockKind::Choice {
                content,
                options: parse_options(self.options.value()),
            },
            BlockType::Separator => BlockKind::Separator { content },
        };
        Block {
            id: self.block_id.clone(),
            kind,
        }
    }

    pub fn set_completions(&mut self, completions: Vec<Completion>) {
        self.completion_selected = if completions.is_empty() { None } else { Some(0) };
        self.completions = completions;
        self.autocomplete_loading = false;
    }

    pub fn select_next_completion(&mut self) {
        if self.completions.is_empty() {
            return;
        }
        self.completion_selected = Some(match self.completion_selected {
            Some(i) => (i + 1) % self.completions.len(),
            None => 0,
        });
    }

    pub fn select_prev_completion(&mut self) {
        if self.completions.is_empty() {
            return;
        }
        let len = self.completions.len();
        self.completion_selected = Some(match self.completion_selected {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        });
    }

    /// Replace the text with the selected completion.
    pub fn accept_completion(&mut self) -> bool {
        let Some(completion) = self
            .completion_selected
            .and_then(|i| self.completions.get(i))
        else {
            return false;
        };
        self.content.set(completion.text.clone());
        self.completions.clear();
        self.completion_selected = None;
        self.autocomplete_pending_since = None;
        true
    }

    pub fn dismiss_completions(&mut self) {
        self.completions.clear();
        self.completion_selected = None;
    }
}

/// Which field is focused in the metadata modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Title,
    Description,
    Categories,
    Tags,
    SuggestedTags,
    SaveButton,
    CancelButton,
}

impl MetadataField {
    pub fn next(self) -> Self {
        match self {
            Self::Title => Self::Description,
            Self::Description => Self::Categories,
            Self::Categories => Self::Tags,
            Self::Tags => Self::SuggestedTags,
            Self::SuggestedTags => Self::SaveButton,
            Self::SaveButton => Self::CancelButton,
            Self::CancelButton => Self::Title,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Title => Self::CancelButton,
            Self::Description => Self::Title,
            Self::Categories => Self::Description,
            Self::Tags => Self::Categories,
            Self::SuggestedTags => Self::Tags,
            Self::SaveButton => Self::SuggestedTags,
            Self::CancelButton => Self::SaveButton,
        }
    }
}

/// State for the title/description/category/tag editor.
#[derive(Debug, Clone)]
pub struct MetadataModalState {
    pub focus: MetadataField,
    pub title: TextInput,
    pub description: TextInput,
    pub categories: Vec<Category>,
    pub category_cursor: usize,
    pub tags: Vec<String>,
    pub tag_input: TextInput,
    pub suggested_cursor: usize,
}

impl MetadataModalState {
    pub fn from_template(template: &Template) -> Self {
        Self {
            focus: MetadataField::Title,
            title: TextInput::new(template.title.clone()),
            description: TextInput::new(template.description.clone()),
            categories: template.category.clone(),
            category_cursor: 0,
            tags: template.tags.clone(),
            tag_input: TextInput::default(),
            suggested_cursor: 0,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn toggle_category_at_cursor(&mut self) {
        if let Some(category) = Category::ALL.get(self.category_cursor) {
            toggle_category(&mut self.categories, *category);
        }
    }

    /// Add the typed tag. Returns true if it was new.
    pub fn commit_tag_input(&mut self) -> bool {
        let tag = self.tag_input.take();
        insert_tag(&mut self.tags, &tag)
    }

    /// Add the highlighted suggested tag, or remove it if already present.
    pub fn toggle_suggested_tag(&mut self) {
        let Some(tag) = SUGGESTED_TAGS.get(self.suggested_cursor) else {
            return;
        };
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag.to_string());
        }
    }

    pub fn to_patch(&self) -> TemplatePatch {
        TemplatePatch {
            title: Some(self.title.value().trim().to_string()),
            description: Some(self.description.value().trim().to_string()),
            category: Some(self.categories.clone()),
            tags: Some(self.tags.clone()),
            ..Default::default()
        }
    }
}

/// Something that needs a yes/no before it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmKind {
    /// The action would drop unsaved edits.
    Discard(PendingAction),
    Delete { id: String, title: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmButton {
    Confirm,
    Cancel,
}

impl ConfirmButton {
    pub fn next(self) -> Self {
        match self {
            Self::Confirm => Self::Cancel,
            Self::Cancel => Self::Confirm,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmState {
    pub kind: ConfirmKind,
    pub focus: ConfirmButton,
}

impl ConfirmState {
    pub fn new(kind: ConfirmKind) -> Self {
        Self {
            kind,
            focus: ConfirmButton::Cancel,
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ConfirmKind::Discard(_) => "You have unsaved changes. Discard them?".to_string(),
            ConfirmKind::Delete { title, .. } => format!("Delete \"{}\"? This cannot be undone.", title),
        }
    }
}

/// Tabs of the AI assistant panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiTab {
    #[default]
    Suggestions,
    Examples,
}

impl AiTab {
    pub fn toggle(self) -> Self {
        match self {
            Self::Suggestions => Self::Examples,
            Self::Examples => Self::Suggestions,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AiPanelState {
    pub tab: AiTab,
    pub selected: usize,
}

/// Read-only view of a gallery template.
#[derive(Debug, Clone)]
pub struct TemplateViewState {
    pub template: Template,
    pub scroll: u16,
}

/// Handle keyboard input for the block editor.
pub fn handle_block_editor_input(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    let Some(state) = &mut app.block_editor else {
        return;
    };

    if !state.completions.is_empty() {
        match key_code {
            KeyCode::Down => {
                state.select_next_completion();
                return;
            }
            KeyCode::Up => {
                state.select_prev_completion();
                return;
            }
            KeyCode::Enter if state.accept_completion() => {
                debug!(block_id = %state.block_id, "completion_accepted");
                return;
            }
            KeyCode::Esc => {
                state.dismiss_completions();
                return;
            }
            _ => {}
        }
    }

    match key_code {
        KeyCode::Tab => {
            if modifiers.contains(KeyModifiers::SHIFT) {
                state.focus_prev();
            } else {
                state.focus_next();
            }
        }
        KeyCode::BackTab => state.focus_prev(),
        KeyCode::Esc => {
            app.close_block_editor();
        }
        KeyCode::Char('s') if modifiers.contains(KeyModifiers::CONTROL) => {
            let block = state.to_block();
            let is_new = state.is_new;
            app.commit_block_edit(block, is_new);
        }
        KeyCode::Enter => match state.focus {
            BlockEditorField::SaveButton => {
                let block = state.to_block();
                let is_new = state.is_new;
                app.commit_block_edit(block, is_new);
            }
            BlockEditorField::CancelButton => {
                app.close_block_editor();
            }
            _ => state.focus_next(),
        },
        KeyCode::Up => state.focus_prev(),
        KeyCode::Down => state.focus_next(),
        _ => {
            let autocompletes = state.autocompletes();
            if let Some(input) = state.focused_input()
                && input.handle_key(key_code)
                && autocompletes
            {
                state.autocomplete_pending_since = Some(Instant::now());
            }
        }
    }
}

/// Handle keyboard input for the metadata modal.
pub fn handle_metadata_modal_input(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    let Some(state) = &mut app.metadata_modal else {
        return;
    };

    match key_code {
        KeyCode::Tab => {
            if modifiers.contains(KeyModifiers::SHIFT) {
                state.focus_prev();
            } else {
                state.focus_next();
            }
        }
        KeyCode::BackTab => state.focus_prev(),
        KeyCode::Esc => {
            app.metadata_modal = None;
        }
        KeyCode::Char('s') if modifiers.contains(KeyModifiers::CONTROL) => {
            let patch = state.to_patch();
            app.commit_metadata(patch);
        }
        KeyCode::Enter => match state.focus {
            MetadataField::SaveButton => {
                let patch = state.to_patch();
                app.commit_metadata(patch);
            }
            MetadataField::CancelButton => {
                app.metadata_modal = None;
            }
            MetadataField::Categories => state.toggle_category_at_cursor(),
            MetadataField::SuggestedTags => state.toggle_suggested_tag(),
            MetadataField::Tags if !state.tag_input.is_blank() => {
                state.commit_tag_input();
            }
            _ => state.focus_next(),
        },
        KeyCode::Char(' ') if state.focus == MetadataField::Categories => {
            state.toggle_category_at_cursor();
        }
        KeyCode::Char(' ') if state.focus == MetadataField::SuggestedTags => {
            state.toggle_suggested_tag();
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down
            if matches!(
                state.focus,
                MetadataField::Categories | MetadataField::SuggestedTags
            ) =>
        {
            let forward = matches!(key_code, KeyCode::Right | KeyCode::Down);
            let (cursor, len) = if state.focus == MetadataField::Categories {
                (&mut state.category_cursor, Category::ALL.len())
            } else {
                (&mut state.suggested_cursor, SUGGESTED_TAGS.len())
            };
            *cursor = if forward {
                (*cursor + 1) % len
            } else {
                (*cursor + len - 1) % len
            };
        }
        KeyCode::Backspace if state.focus == MetadataField::Tags && state.tag_input.value().is_empty() => {
            state.tags.pop();
        }
        _ => {
            let input = match state.focus {
                MetadataField::Title => Some(&mut state.title),
                MetadataField::Description => Some(&mut state.description),
                MetadataField::Tags => Some(&mut state.tag_input),
                _ => None,
            };
            if let Some(input) = input {
                input.handle_key(key_code);
            }
        }
    }
}

/// Handle keyboard input for the confirmation dialog.
pub fn handle_confirm_input(app: &mut App, key_code: KeyCode) {
    let Some(state) = &mut app.confirm else {
        return;
    };

    match key_code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
            state.focus = state.focus.next();
        }
        KeyCode::Esc | KeyCode::Char('n') => {
            app.confirm = None;
        }
        KeyCode::Char('y') => {
            if let Some(state) = app.confirm.take() {
                app.confirm_action(state.kind);
            }
        }
        KeyCode::Enter => {
            if let Some(state) = app.confirm.take()
                && state.focus == ConfirmButton::Confirm
            {
                app.confirm_action(state.kind);
            }
        }
        _ => {}
    }
}

/// Handle keyboard input for the save-errors dialog.
pub fn handle_save_errors_input(app: &mut App, key_code: KeyCode) {
    if matches!(key_code, KeyCode::Esc | KeyCode::Enter) {
        app.save_errors = None;
    }
}

/// Handle keyboard input for the AI assistant panel.
pub fn handle_ai_panel_input(app: &mut App, key_code: KeyCode) {
    let Some(state) = &mut app.ai_panel else {
        return;
    };

    let tab = state.tab;
    let len = match tab {
        AiTab::Suggestions => app.suggestions.len(),
        AiTab::Examples => app.examples.len(),
    };

    match key_code {
        KeyCode::Esc => {
            app.ai_panel = None;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            state.tab = state.tab.toggle();
            state.selected = 0;
            if state.tab == AiTab::Examples && app.examples.is_empty() {
                app.request_examples();
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.selected = state.selected.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if state.selected + 1 < len {
                state.selected += 1;
            }
        }
        KeyCode::Char('r') => match tab {
            AiTab::Suggestions => app.request_suggestions(),
            AiTab::Examples => app.request_examples(),
        },
        KeyCode::Enter if state.tab == AiTab::Suggestions => {
            if let Some(suggestion) = app.suggestions.get(state.selected) {
                let text = suggestion.text.clone();
                app.editor.apply_suggestion(&text);
                app.select_last_block();
                app.notify("Suggestion added as a text block");
            }
        }
        _ => {}
    }
}

/// Handle keyboard input for the template viewer.
pub fn handle_template_view_input(app: &mut App, key_code: KeyCode) {
    let Some(state) = &mut app.template_view else {
        return;
    };

    match key_code {
        KeyCode::Esc | KeyCode::Enter => {
            app.template_view = None;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.scroll = state.scroll.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.scroll = state.scroll.saturating_add(1);
        }
        KeyCode::Char('e') => {
            let id = state.template.id.clone();
            app.template_view = None;
            app.guard(PendingAction::Open(id));
        }
        _ => {}
    }
}

/// Handle keyboard input for the help modal.
pub fn handle_help_input(app: &mut App, key_code: KeyCode) {
    if matches!(key_code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter) {
        app.show_help = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> TextInput {
        let mut input = TextInput::default();
        for c in s.chars() {
            input.insert_char(c);
        }
        input
    }

    #[test]
    fn test_text_input_edits_at_cursor() {
        let mut input = typed("helo");
        input.cursor_left();
        input.insert_char('l');
        assert_eq!(input.value(), "hello");
        assert_eq!(input.cursor(), 4);

        input.cursor_home();
        assert!(!input.delete_char_before());
        assert!(input.delete_char_at());
        assert_eq!(input.value(), "ello");

        input.cursor_end();
        assert!(input.delete_char_before());
        assert_eq!(input.value(), "ell");
    }

    #[test]
    fn test_text_input_multibyte_chars() {
        let mut input = typed("añb");
        input.cursor_left();
        assert!(input.delete_char_before());
        assert_eq!(input.value(), "ab");
        assert_eq!(input.split_at_cursor(), ("a", Some('b'), ""));
    }

    #[test]
    fn test_text_input_take() {
        let mut input = typed("tag");
        assert_eq!(input.take(), "tag");
        assert_eq!(input.cursor(), 0);
        assert!(input.is_blank());
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(
            parse_options(" short | long ||  "),
            vec!["short".to_string(), "long".to_string()]
        );
        assert_eq!(format_options(&parse_options("a|b")), "a | b");
    }

    #[test]
    fn test_block_editor_focus_wraps_per_type() {
        let mut state = BlockEditorState::new_block(BlockType::Variable);
        assert_eq!(state.focus, BlockEditorField::Content);
        state.focus_next();
        assert_eq!(state.focus, BlockEditorField::Description);
        state.focus_next();
        state.focus_next();
        state.focus_next();
        assert_eq!(state.focus, BlockEditorField::Content);
        state.focus_prev();
        assert_eq!(state.focus, BlockEditorField::CancelButton);
    }

    #[test]
    fn test_block_editor_round_trips_choice() {
        let block = Block::choice("Tone", vec!["formal".to_string(), "casual".to_string()]);
        let state = BlockEditorState::edit(&block);
        assert!(!state.is_new);
        assert_eq!(state.options.value(), "formal | casual");
        assert_eq!(state.to_block(), block);
    }

    #[test]
    fn test_block_editor_blank_description_is_none() {
        let mut state = BlockEditorState::new_block(BlockType::Variable);
        state.content.set(" topic ");
        state.description.set("   ");
        match state.to_block().kind {
            BlockKind::Variable {
                content,
                description,
            } => {
                assert_eq!(content, "topic");
                assert_eq!(description, None);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_accept_completion_replaces_text() {
        let mut state = BlockEditorState::new_block(BlockType::Text);
        state.content.set("Write a");
        state.set_completions(vec![
            Completion {
                text: "Write a haiku".to_string(),
                explanation: String::new(),
            },
            Completion {
                text: "Write a limerick".to_string(),
                explanation: String::new(),
            },
        ]);
        state.select_prev_completion();
        assert_eq!(state.completion_selected, Some(1));
        assert!(state.accept_completion());
        assert_eq!(state.content.value(), "Write a limerick");
        assert!(state.completions.is_empty());
        assert!(!state.accept_completion());
    }

    #[test]
    fn test_metadata_field_next_wraparound() {
        assert_eq!(MetadataField::CancelButton.next(), MetadataField::Title);
        assert_eq!(MetadataField::Title.prev(), MetadataField::CancelButton);
    }

    #[test]
    fn test_metadata_field_next_prev_inverse() {
        let all = [
            MetadataField::Title,
            MetadataField::Description,
            MetadataField::Categories,
            MetadataField::Tags,
            MetadataField::SuggestedTags,
            MetadataField::SaveButton,
            MetadataField::CancelButton,
        ];
        for field in all {
            assert_eq!(field.next().prev(), field);
        }
    }

    #[test]
    fn test_metadata_tags_and_categories() {
        let mut state = MetadataModalState::from_template(&Template::new());
        state.tag_input.set("  Research ");
        assert!(state.commit_tag_input());
        state.tag_input.set("Research");
        assert!(!state.commit_tag_input());

        state.suggested_cursor = 0;
        state.toggle_suggested_tag();
        state.toggle_suggested_tag();
        state.toggle_suggested_tag();
        assert_eq!(state.tags, vec!["Research".to_string(), "AI".to_string()]);

        state.category_cursor = 1;
        state.toggle_category_at_cursor();
        let patch = state.to_patch();
        assert_eq!(patch.category, Some(vec![Category::ALL[1]]));
    }
}
