//! Application state and core logic.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::block::{Block, BlockType};
use crate::chat::{CHANNELS, ChannelMessage};
use crate::config::{Config, ConfigLoadStatus, LoadedConfig};
use crate::editor::{Editor, Move};
use crate::error::PromptError;
use crate::events::{AiEvent, AiTasks};
use crate::gallery::GalleryQuery;
use crate::guides::GUIDES;
use crate::modals::{
    AiPanelState, AiTab, BlockEditorState, ConfirmKind, ConfirmState, MetadataModalState,
    TemplateViewState, TextInput, handle_ai_panel_input, handle_block_editor_input,
    handle_confirm_input, handle_help_input, handle_metadata_modal_input,
    handle_save_errors_input, handle_template_view_input,
};
use crate::render::{self, ViewMode};
use crate::store::Database;
use crate::suggest::{Example, Suggestion, SuggestionService};
use crate::template::{Category, Owner, Template, TemplatePatch};

/// How long a notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Top-level screens, switched with F1-F5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Builder,
    Gallery,
    Profile,
    Learn,
    Chat,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Builder,
        Screen::Gallery,
        Screen::Profile,
        Screen::Learn,
        Screen::Chat,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Builder => "Builder",
            Self::Gallery => "Gallery",
            Self::Profile => "My Prompts",
            Self::Learn => "Learn",
            Self::Chat => "Community",
        }
    }

    /// Screen bound to function key `n`.
    pub fn from_function_key(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient message in the footer.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
    pub shown_at: Instant,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= NOTICE_TTL
    }
}

/// An action that replaces the template being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    NewTemplate,
    Open(String),
    Quit,
}

/// Main application state.
pub struct App {
    /// Session ID for this invocation.
    pub session_id: String,
    /// Directory where logs are written.
    pub log_directory: Option<PathBuf>,
    pub config: Config,
    pub config_path: PathBuf,
    pub project_config_path: Option<PathBuf>,
    /// Identity used for attribution and ownership checks.
    pub owner: Owner,
    pub db: Database,
    pub ai: AiTasks,
    ai_events: Receiver<AiEvent>,
    pub screen: Screen,
    pub editor: Editor,
    /// Bumped whenever another template is loaded into the editor. AI
    /// results requested under an older generation are dropped.
    pub editor_generation: u64,
    pub selected_block: usize,
    pub view_mode: ViewMode,
    pub preview_scroll: u16,
    pub notice: Option<Notice>,
    pub suggestions: Vec<Suggestion>,
    /// Editor revision the current suggestions were requested for.
    pub suggestions_revision: Option<u64>,
    pub suggestions_loading: bool,
    pub examples: Vec<Example>,
    pub examples_loading: bool,
    /// Sequence number of the latest autocomplete request.
    pub autocomplete_seq: u64,
    pub gallery_query: GalleryQuery,
    pub gallery: Vec<Template>,
    pub gallery_selected: usize,
    /// Keystrokes go to the gallery search box.
    pub gallery_searching: bool,
    pub profile: Vec<Template>,
    pub profile_selected: usize,
    pub guide_selected: usize,
    pub guide_scroll: u16,
    pub chat_channel: usize,
    pub chat_messages: Vec<ChannelMessage>,
    pub chat_input: TextInput,
    pub block_editor: Option<BlockEditorState>,
    pub metadata_modal: Option<MetadataModalState>,
    pub confirm: Option<ConfirmState>,
    /// Validation failures from the last save attempt.
    pub save_errors: Option<Vec<String>>,
    pub ai_panel: Option<AiPanelState>,
    pub template_view: Option<TemplateViewState>,
    pub show_help: bool,
    pub should_quit: bool,
    /// Frame counter for animations (incremented each render cycle).
    pub frame_count: u64,
}

impl App {
    pub fn new(
        session_id: String,
        log_directory: Option<PathBuf>,
        loaded_config: LoadedConfig,
        db: Database,
        service: Arc<SuggestionService>,
        runtime: Handle,
    ) -> Self {
        let (sender, ai_events) = mpsc::channel();
        let owner = loaded_config.config.owner();
        let mut app = Self {
            session_id,
            log_directory,
            config: loaded_config.config,
            config_path: loaded_config.config_path.clone(),
            project_config_path: loaded_config.project_config_path.clone(),
            owner,
            db,
            ai: AiTasks::new(runtime, service, sender),
            ai_events,
            screen: Screen::Builder,
            editor: Editor::new(),
            editor_generation: 0,
            selected_block: 0,
            view_mode: ViewMode::default(),
            preview_scroll: 0,
            notice: None,
            suggestions: Vec::new(),
            suggestions_revision: None,
            suggestions_loading: false,
            examples: Vec::new(),
            examples_loading: false,
            autocomplete_seq: 0,
            gallery_query: GalleryQuery::default(),
            gallery: Vec::new(),
            gallery_selected: 0,
            gallery_searching: false,
            profile: Vec::new(),
            profile_selected: 0,
            guide_selected: 0,
            guide_scroll: 0,
            chat_channel: 0,
            chat_messages: Vec::new(),
            chat_input: TextInput::default(),
            block_editor: None,
            metadata_modal: None,
            confirm: None,
            save_errors: None,
            ai_panel: None,
            template_view: None,
            show_help: false,
            should_quit: false,
            frame_count: 0,
        };

        match &loaded_config.status {
            ConfigLoadStatus::Created => app.notify(format!(
                "Created config at {}",
                loaded_config.config_path.display()
            )),
            ConfigLoadStatus::Error(e) => app.notify_error(format!("Config error: {}", e)),
            ConfigLoadStatus::Loaded => {}
        }
        if let Some(e) = &loaded_config.project_error {
            app.notify_error(e.clone());
        }
        app
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.show_notice(text.into(), NoticeLevel::Info);
    }

    pub fn notify_error(&mut self, text: impl Into<String>) {
        self.show_notice(text.into(), NoticeLevel::Error);
    }

    fn show_notice(&mut self, text: String, level: NoticeLevel) {
        self.notice = Some(Notice {
            text,
            level,
            shown_at: Instant::now(),
        });
    }

    /// Surface a failed operation to the user.
    pub fn report(&mut self, error: PromptError) {
        match error {
            PromptError::Validation(errors) => self.save_errors = Some(errors),
            e if e.is_transient() => {
                self.show_notice(e.to_string(), NoticeLevel::Warning);
            }
            PromptError::Adapter(message) => {
                warn!(error = %message, "operation_failed");
                self.notify_error("Something went wrong. Check the log for details.");
            }
            e => self.notify_error(e.to_string()),
        }
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        if self.screen != screen {
            debug!(from = ?self.screen, to = ?screen, "screen_switched");
        }
        self.screen = screen;
        self.gallery_searching = false;
        match screen {
            Screen::Gallery => self.refresh_gallery(),
            Screen::Profile => self.refresh_profile(),
            Screen::Chat => self.refresh_chat(),
            Screen::Builder | Screen::Learn => {}
        }
    }

    pub fn refresh_gallery(&mut self) {
        match self.db.get_all() {
            Ok(all) => {
                self.gallery = self.gallery_query.apply(&all);
                self.gallery_selected = clamp_index(self.gallery_selected, self.gallery.len());
            }
            Err(e) => self.report(e),
        }
    }

    pub fn refresh_profile(&mut self) {
        match self.db.get_user_prompts(&self.owner.user_id) {
            Ok(prompts) => {
                self.profile = prompts;
                self.profile_selected = clamp_index(self.profile_selected, self.profile.len());
            }
            Err(e) => self.report(e),
        }
    }

    pub fn refresh_chat(&mut self) {
        let Some(channel) = CHANNELS.get(self.chat_channel) else {
            return;
        };
        match self.db.messages(channel.id) {
            Ok(messages) => self.chat_messages = messages,
            Err(e) => self.report(e),
        }
    }

    // ---- Builder ----

    pub fn selected_block(&self) -> Option<&Block> {
        self.editor.template().blocks.get(self.selected_block)
    }

    pub fn select_last_block(&mut self) {
        self.selected_block = self.editor.template().blocks.len().saturating_sub(1);
    }

    fn clamp_block_selection(&mut self) {
        self.selected_block =
            clamp_index(self.selected_block, self.editor.template().blocks.len());
    }

    /// Add a block of the given type. Separators go in directly, the rest open the editor.
    pub fn begin_add_block(&mut self, block_type: BlockType) {
        if block_type == BlockType::Separator {
            self.editor.add_block(Block::separator());
            self.select_last_block();
            return;
        }
        self.block_editor = Some(BlockEditorState::new_block(block_type));
    }

    pub fn begin_edit_block(&mut self) {
        let Some(block) = self.selected_block() else {
            return;
        };
        if block.block_type() == BlockType::Separator {
            return;
        }
        self.block_editor = Some(BlockEditorState::edit(block));
    }

    /// Close the block editor. Autocomplete requests still in flight for it
    /// are abandoned.
    pub fn close_block_editor(&mut self) {
        if self.block_editor.take().is_some() {
            self.autocomplete_seq += 1;
        }
    }

    pub fn commit_block_edit(&mut self, block: Block, is_new: bool) {
        self.close_block_editor();
        if is_new {
            self.editor.add_block(block);
            self.select_last_block();
        } else {
            let id = block.id.clone();
            self.editor.update_block(&id, block);
        }
    }

    pub fn remove_selected_block(&mut self) {
        let Some(id) = self.selected_block().map(|b| b.id.clone()) else {
            return;
        };
        self.editor.remove_block(&id);
        self.clamp_block_selection();
    }

    pub fn move_selected_block(&mut self, direction: Move) {
        let Some(id) = self.selected_block().map(|b| b.id.clone()) else {
            return;
        };
        if let Some(index) = self.editor.move_block(&id, direction) {
            self.selected_block = index;
        }
    }

    pub fn open_metadata(&mut self) {
        self.metadata_modal = Some(MetadataModalState::from_template(self.editor.template()));
    }

    pub fn commit_metadata(&mut self, patch: TemplatePatch) {
        self.metadata_modal = None;
        self.editor.update_metadata(patch);
    }

    /// Write the interpolated plain text to a file in `dir`.
    pub fn write_plain_text(&mut self, dir: &Path) {
        let path = dir.join(render::export_file_name(self.editor.template()));
        match fs::write(&path, render::plain_text(self.editor.template())) {
            Ok(()) => {
                info!(path = ?path, "plain_text_written");
                self.notify(format!("Wrote {}", path.display()));
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "plain_text_write_failed");
                self.notify_error(format!("Could not write {}: {}", path.display(), e));
            }
        }
    }

    pub fn undo(&mut self) {
        if self.editor.undo() {
            self.clamp_block_selection();
        }
    }

    pub fn redo(&mut self) {
        if self.editor.redo() {
            self.clamp_block_selection();
        }
    }

    pub fn save(&mut self) {
        match self.editor.save(&self.db, &self.owner) {
            Ok(id) => {
                self.notify(format!("Saved \"{}\"", self.editor.template().title));
                debug!(id = %id, "save_completed");
            }
            Err(e @ (PromptError::Forbidden { .. } | PromptError::NotFound(_))) => {
                self.notify_error(e.to_string());
                self.switch_screen(Screen::Profile);
            }
            Err(e) => self.report(e),
        }
    }

    /// Run `action`, asking first if it would drop unsaved edits.
    pub fn guard(&mut self, action: PendingAction) {
        if self.editor.has_unsaved_changes() && self.config.behavior.confirm_discard {
            self.confirm = Some(ConfirmState::new(ConfirmKind::Discard(action)));
        } else {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: PendingAction) {
        match action {
            PendingAction::NewTemplate => {
                self.load_editor(Editor::new());
                self.switch_screen(Screen::Builder);
            }
            PendingAction::Open(id) => match Editor::open(&self.db, &id, &self.owner) {
                Ok(editor) => {
                    self.load_editor(editor);
                    self.switch_screen(Screen::Builder);
                }
                Err(e @ (PromptError::Forbidden { .. } | PromptError::NotFound(_))) => {
                    self.notify_error(e.to_string());
                    self.switch_screen(Screen::Profile);
                }
                Err(e) => self.report(e),
            },
            PendingAction::Quit => self.should_quit = true,
        }
    }

    fn load_editor(&mut self, editor: Editor) {
        self.editor = editor;
        self.editor_generation += 1;
        self.selected_block = 0;
        self.preview_scroll = 0;
        self.suggestions.clear();
        self.suggestions_revision = None;
        self.suggestions_loading = false;
        self.examples.clear();
        self.examples_loading = false;
        self.close_block_editor();
        self.ai_panel = None;
    }

    pub fn confirm_action(&mut self, kind: ConfirmKind) {
        match kind {
            ConfirmKind::Discard(action) => self.perform(action),
            ConfirmKind::Delete { id, .. } => self.delete_template(&id),
        }
    }

    /// Ask before deleting one of the user's templates.
    pub fn request_delete(&mut self, template: &Template) {
        if !template.is_owned_by(&self.owner.user_id) {
            self.report(PromptError::Forbidden {
                id: template.id.clone(),
            });
            return;
        }
        self.confirm = Some(ConfirmState::new(ConfirmKind::Delete {
            id: template.id.clone(),
            title: template.title.clone(),
        }));
    }

    fn delete_template(&mut self, id: &str) {
        let result = self.db.get_by_id(id).and_then(|found| match found {
            Some(t) if t.is_owned_by(&self.owner.user_id) => self.db.delete(id),
            Some(_) => Err(PromptError::Forbidden { id: id.to_string() }),
            None => Err(PromptError::NotFound(format!("prompt {}", id))),
        });
        match result {
            Ok(_) => {
                info!(id, "template_deleted");
                if self.editor.persisted_id() == Some(id) {
                    self.load_editor(Editor::new());
                }
                self.notify("Prompt deleted");
            }
            Err(e) => self.report(e),
        }
        self.refresh_profile();
    }

    // ---- AI ----

    /// Open the assistant panel, loading suggestions if there are none yet.
    pub fn open_ai_panel(&mut self) {
        self.ai_panel = Some(AiPanelState::default());
        if self.suggestions.is_empty() {
            self.request_suggestions();
        }
    }

    pub fn request_suggestions(&mut self) {
        if self.suggestions_loading {
            return;
        }
        if self.editor.template().blocks.is_empty() {
            self.notify("Add some blocks before asking for suggestions");
            return;
        }
        self.suggestions_loading = true;
        self.ai.request_suggestions(
            self.editor.template().clone(),
            self.editor_generation,
            self.editor.revision(),
        );
    }

    pub fn request_examples(&mut self) {
        if self.examples_loading {
            return;
        }
        if self.editor.template().blocks.is_empty() {
            self.notify("Add some blocks before asking for examples");
            return;
        }
        self.examples_loading = true;
        self.ai
            .request_examples(self.editor.template().clone(), self.editor_generation);
    }

    /// Drain finished AI requests.
    pub fn poll_ai(&mut self) {
        loop {
            match self.ai_events.try_recv() {
                Ok(event) => self.handle_ai_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("ai_channel_disconnected");
                    break;
                }
            }
        }
    }

    pub fn handle_ai_event(&mut self, event: AiEvent) {
        match event {
            AiEvent::Suggestions {
                generation,
                revision,
                result,
            } => {
                if generation != self.editor_generation {
                    debug!(generation, current = self.editor_generation, "stale_suggestions_discarded");
                    return;
                }
                self.suggestions_loading = false;
                match result {
                    Ok(suggestions) => {
                        debug!(revision, count = suggestions.len(), "suggestions_received");
                        self.suggestions = suggestions;
                        self.suggestions_revision = Some(revision);
                        if let Some(panel) = &mut self.ai_panel
                            && panel.tab == AiTab::Suggestions
                        {
                            panel.selected = 0;
                        }
                    }
                    Err(e) => self.report(e),
                }
            }
            AiEvent::Examples { generation, result } => {
                if generation != self.editor_generation {
                    debug!(generation, current = self.editor_generation, "stale_examples_discarded");
                    return;
                }
                self.examples_loading = false;
                match result {
                    Ok(examples) => self.examples = examples,
                    Err(e) => self.report(e),
                }
            }
            AiEvent::Autocomplete {
                seq,
                block_id,
                result,
            } => {
                let current = self.autocomplete_seq;
                let Some(state) = self
                    .block_editor
                    .as_mut()
                    .filter(|s| s.block_id == block_id && seq == current)
                else {
                    debug!(seq, latest = current, block_id = %block_id, "stale_autocomplete_discarded");
                    return;
                };
                match result {
                    Ok(completions) => state.set_completions(completions),
                    Err(e) => {
                        state.autocomplete_loading = false;
                        self.report(e);
                    }
                }
            }
        }
    }

    /// Whether the suggestions on screen were made for an older version of the template.
    pub fn suggestions_outdated(&self) -> bool {
        self.suggestions_revision
            .is_some_and(|r| r != self.editor.revision())
    }

    /// Periodic work: expire notices and fire debounced autocomplete.
    pub fn tick(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
        }

        let debounce = Duration::from_millis(self.config.behavior.autocomplete_debounce_ms);
        let min_chars = self.config.behavior.autocomplete_min_chars;
        let Some(state) = &mut self.block_editor else {
            return;
        };
        let Some(since) = state.autocomplete_pending_since else {
            return;
        };
        if now.duration_since(since) < debounce {
            return;
        }
        state.autocomplete_pending_since = None;
        if state.content.char_count() < min_chars {
            state.dismiss_completions();
            return;
        }
        self.autocomplete_seq += 1;
        state.autocomplete_loading = true;
        self.ai.request_autocomplete(
            state.content.value().to_string(),
            state.block_id.clone(),
            self.autocomplete_seq,
        );
    }

    // ---- Chat ----

    pub fn select_channel(&mut self, index: usize) {
        self.chat_channel = index % CHANNELS.len();
        self.refresh_chat();
    }

    pub fn post_chat_message(&mut self) {
        let Some(channel) = CHANNELS.get(self.chat_channel) else {
            return;
        };
        match self.db.post(channel.id, self.chat_input.value(), &self.owner) {
            Ok(_) => {
                self.chat_input.take();
                self.refresh_chat();
            }
            Err(e) => self.report(e),
        }
    }

    // ---- Input ----

    /// Whether keystrokes currently go into a text field on the screen itself.
    fn typing(&self) -> bool {
        self.screen == Screen::Chat || (self.screen == Screen::Gallery && self.gallery_searching)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            self.guard(PendingAction::Quit);
            return;
        }

        // Modals take input in stacking order
        if self.confirm.is_some() {
            handle_confirm_input(self, key.code);
            return;
        }
        if self.save_errors.is_some() {
            handle_save_errors_input(self, key.code);
            return;
        }
        if self.show_help {
            handle_help_input(self, key.code);
            return;
        }
        if self.block_editor.is_some() {
            handle_block_editor_input(self, key.code, key.modifiers);
            return;
        }
        if self.metadata_modal.is_some() {
            handle_metadata_modal_input(self, key.code, key.modifiers);
            return;
        }
        if self.ai_panel.is_some() {
            handle_ai_panel_input(self, key.code);
            return;
        }
        if self.template_view.is_some() {
            handle_template_view_input(self, key.code);
            return;
        }

        if let KeyCode::F(n) = key.code
            && let Some(screen) = Screen::from_function_key(n)
        {
            self.switch_screen(screen);
            return;
        }

        if !self.typing() {
            match key.code {
                KeyCode::Char('q') => {
                    self.guard(PendingAction::Quit);
                    return;
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                    return;
                }
                _ => {}
            }
        }

        match self.screen {
            Screen::Builder => self.handle_builder_key(key.code, ctrl),
            Screen::Gallery => self.handle_gallery_key(key.code),
            Screen::Profile => self.handle_profile_key(key.code),
            Screen::Learn => self.handle_learn_key(key.code),
            Screen::Chat => self.handle_chat_key(key.code),
        }
    }

    fn handle_builder_key(&mut self, key_code: KeyCode, ctrl: bool) {
        match key_code {
            KeyCode::Char('z') if ctrl => self.undo(),
            KeyCode::Char('y') if ctrl => self.redo(),
            KeyCode::Char('s') if ctrl => self.save(),
            KeyCode::Char('n') if ctrl => self.guard(PendingAction::NewTemplate),
            KeyCode::Char('s') => self.save(),
            KeyCode::Char('n') => self.guard(PendingAction::NewTemplate),
            KeyCode::Char('t') => self.begin_add_block(BlockType::Text),
            KeyCode::Char('v') => self.begin_add_block(BlockType::Variable),
            KeyCode::Char('o') => self.begin_add_block(BlockType::Choice),
            KeyCode::Char('-') => self.begin_add_block(BlockType::Separator),
            KeyCode::Enter | KeyCode::Char('e') => self.begin_edit_block(),
            KeyCode::Char('d') | KeyCode::Delete => self.remove_selected_block(),
            KeyCode::Char('K') => self.move_selected_block(Move::Up),
            KeyCode::Char('J') => self.move_selected_block(Move::Down),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_block = self.selected_block.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_block = clamp_index(
                    self.selected_block + 1,
                    self.editor.template().blocks.len(),
                );
            }
            KeyCode::Char('m') => self.open_metadata(),
            KeyCode::Char('w') => self.write_plain_text(Path::new(".")),
            KeyCode::Char(c @ '1'..='9') => {
                let index = usize::from(c as u8 - b'1');
                if let Some(category) = Category::ALL.get(index) {
                    self.editor.toggle_category(*category);
                }
            }
            KeyCode::Tab => {
                self.view_mode = self.view_mode.next();
                self.preview_scroll = 0;
            }
            KeyCode::PageUp => self.preview_scroll = self.preview_scroll.saturating_sub(5),
            KeyCode::PageDown => self.preview_scroll = self.preview_scroll.saturating_add(5),
            KeyCode::Char('a') => self.open_ai_panel(),
            KeyCode::Char('x') => {
                self.ai_panel = Some(AiPanelState {
                    tab: AiTab::Examples,
                    selected: 0,
                });
                if self.examples.is_empty() {
                    self.request_examples();
                }
            }
            _ => {}
        }
    }

    fn handle_gallery_key(&mut self, key_code: KeyCode) {
        if self.gallery_searching {
            match key_code {
                KeyCode::Esc | KeyCode::Enter => self.gallery_searching = false,
                KeyCode::Backspace => {
                    self.gallery_query.search.pop();
                    self.refresh_gallery();
                }
                KeyCode::Char(c) => {
                    self.gallery_query.search.push(c);
                    self.refresh_gallery();
                }
                _ => {}
            }
            return;
        }

        match key_code {
            KeyCode::Char('/') => self.gallery_searching = true,
            KeyCode::Char('c') => {
                self.gallery_query.cycle_category();
                self.refresh_gallery();
            }
            KeyCode::Char('o') => {
                self.gallery_query.sort = self.gallery_query.sort.next();
                self.refresh_gallery();
            }
            KeyCode::Esc => {
                self.gallery_query = GalleryQuery::default();
                self.refresh_gallery();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.gallery_selected = self.gallery_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.gallery_selected = clamp_index(self.gallery_selected + 1, self.gallery.len());
            }
            KeyCode::Enter => {
                if let Some(template) = self.gallery.get(self.gallery_selected) {
                    self.template_view = Some(TemplateViewState {
                        template: template.clone(),
                        scroll: 0,
                    });
                }
            }
            KeyCode::Char('e') => {
                if let Some(id) = self.gallery.get(self.gallery_selected).map(|t| t.id.clone()) {
                    self.guard(PendingAction::Open(id));
                }
            }
            _ => {}
        }
    }

    fn handle_profile_key(&mut self, key_code: KeyCode) {
        match key_code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.profile_selected = self.profile_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.profile_selected = clamp_index(self.profile_selected + 1, self.profile.len());
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(id) = self.profile.get(self.profile_selected).map(|t| t.id.clone()) {
                    self.guard(PendingAction::Open(id));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(template) = self.profile.get(self.profile_selected).cloned() {
                    self.request_delete(&template);
                }
            }
            KeyCode::Char('n') => self.guard(PendingAction::NewTemplate),
            _ => {}
        }
    }

    fn handle_learn_key(&mut self, key_code: KeyCode) {
        match key_code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.guide_selected = self.guide_selected.saturating_sub(1);
                self.guide_scroll = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.guide_selected = clamp_index(self.guide_selected + 1, GUIDES.len());
                self.guide_scroll = 0;
            }
            KeyCode::PageUp => self.guide_scroll = self.guide_scroll.saturating_sub(5),
            KeyCode::PageDown => self.guide_scroll = self.guide_scroll.saturating_add(5),
            _ => {}
        }
    }

    fn handle_chat_key(&mut self, key_code: KeyCode) {
        match key_code {
            KeyCode::Tab => self.select_channel(self.chat_channel + 1),
            KeyCode::BackTab => self.select_channel(self.chat_channel + CHANNELS.len() - 1),
            KeyCode::Enter => self.post_chat_message(),
            KeyCode::Esc => {
                self.chat_input.take();
            }
            code => {
                self.chat_input.handle_key(code);
            }
        }
    }
}

/// Keep a list selection inside `0..len`.
fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::ConfigLoadStatus;
    use crate::error::Result;
    use crate::quota::{MemoryUsageStore, QuotaTracker};
    use crate::suggest::{ChatBackend, ChatRequest, Completion};
    use async_trait::async_trait;
    use chrono::{Local, TimeDelta, TimeZone};

    struct CannedBackend;

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn complete(&self, _request: &ChatRequest) -> Result<String> {
            Ok("1. Clarity: Name the audience".to_string())
        }
    }

    fn test_app() -> (App, tokio::runtime::Runtime) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let clock = Arc::new(FixedClock::new(
            Local.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap(),
        ));
        let db = Database::open_in_memory(clock.clone()).unwrap();
        let quota = QuotaTracker::new(Box::new(MemoryUsageStore::new()), clock.clone(), 10);
        let service = SuggestionService::new(
            Arc::new(CannedBackend),
            quota,
            clock,
            TimeDelta::seconds(60),
        );
        let mut config = Config::default();
        config.user.id = "me".to_string();
        let loaded = LoadedConfig {
            config,
            config_path: PathBuf::from("config.toml"),
            project_config_path: None,
            status: ConfigLoadStatus::Loaded,
            project_error: None,
        };
        let app = App::new(
            "abc123".to_string(),
            None,
            loaded,
            db,
            Arc::new(service),
            runtime.handle().clone(),
        );
        (app, runtime)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn complete_template(app: &mut App) {
        app.editor.add_block(Block::text("Summarize"));
        app.editor.update_metadata(TemplatePatch {
            title: Some("Summary".to_string()),
            description: Some("Summarizes things".to_string()),
            category: Some(vec![Category::ALL[0]]),
            ..Default::default()
        });
    }

    #[test]
    fn test_screen_from_function_key() {
        assert_eq!(Screen::from_function_key(1), Some(Screen::Builder));
        assert_eq!(Screen::from_function_key(5), Some(Screen::Chat));
        assert_eq!(Screen::from_function_key(0), None);
        assert_eq!(Screen::from_function_key(6), None);
    }

    #[test]
    fn test_function_keys_switch_screens() {
        let (mut app, _rt) = test_app();
        press(&mut app, KeyCode::F(4));
        assert_eq!(app.screen, Screen::Learn);
        press(&mut app, KeyCode::F(5));
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.chat_messages.len(), 1);
    }

    #[test]
    fn test_add_text_block_through_editor_modal() {
        let (mut app, _rt) = test_app();
        press(&mut app, KeyCode::Char('t'));
        assert!(app.block_editor.is_some());
        type_text(&mut app, "Hello");
        ctrl(&mut app, 's');

        assert!(app.block_editor.is_none());
        let blocks = &app.editor.template().blocks;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content(), "Hello");
        assert!(app.editor.has_unsaved_changes());
    }

    #[test]
    fn test_separator_is_added_directly() {
        let (mut app, _rt) = test_app();
        press(&mut app, KeyCode::Char('-'));
        assert!(app.block_editor.is_none());
        assert_eq!(app.editor.template().blocks[0].block_type(), BlockType::Separator);
    }

    #[test]
    fn test_move_and_remove_keep_selection_in_range() {
        let (mut app, _rt) = test_app();
        app.editor.add_block(Block::text("a"));
        app.editor.add_block(Block::text("b"));
        press(&mut app, KeyCode::Char('J'));
        assert_eq!(app.selected_block, 1);
        assert_eq!(app.editor.template().blocks[1].content(), "a");

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('d'));
        assert!(app.editor.template().blocks.is_empty());
        assert_eq!(app.selected_block, 0);

        ctrl(&mut app, 'z');
        assert_eq!(app.editor.template().blocks.len(), 1);
    }

    #[test]
    fn test_digit_keys_toggle_categories() {
        let (mut app, _rt) = test_app();
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.editor.template().category, vec![Category::ALL[1]]);
        press(&mut app, KeyCode::Char('2'));
        assert!(app.editor.template().category.is_empty());
        press(&mut app, KeyCode::Char('9'));
        assert!(app.editor.template().category.is_empty());
    }

    #[test]
    fn test_write_plain_text_to_file() {
        let (mut app, _rt) = test_app();
        let dir = tempfile::tempdir().unwrap();
        app.editor.add_block(Block::text("Summarize"));
        app.editor.add_block(Block::variable("topic", None));
        app.editor.update_metadata(TemplatePatch {
            title: Some("Daily Summary".to_string()),
            ..Default::default()
        });

        app.write_plain_text(dir.path());
        let written = std::fs::read_to_string(dir.path().join("daily-summary.txt")).unwrap();
        assert_eq!(written, "Summarize <topic>");
        assert_eq!(app.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Info));

        app.write_plain_text(&dir.path().join("missing"));
        assert_eq!(app.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_save_incomplete_template_lists_every_error() {
        let (mut app, _rt) = test_app();
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.save_errors.as_ref().map(Vec::len), Some(4));
        press(&mut app, KeyCode::Esc);
        assert!(app.save_errors.is_none());
    }

    #[test]
    fn test_save_then_profile_lists_template() {
        let (mut app, _rt) = test_app();
        complete_template(&mut app);
        press(&mut app, KeyCode::Char('s'));
        assert!(!app.editor.has_unsaved_changes());
        assert!(app.editor.persisted_id().is_some());

        press(&mut app, KeyCode::F(3));
        assert_eq!(app.profile.len(), 1);
        assert_eq!(app.profile[0].user_id.as_deref(), Some("me"));
    }

    #[test]
    fn test_metadata_save_without_edits_keeps_template_clean() {
        let (mut app, _rt) = test_app();
        complete_template(&mut app);
        app.save();
        assert!(!app.editor.has_unsaved_changes());

        app.open_metadata();
        ctrl(&mut app, 's');
        assert!(app.metadata_modal.is_none());
        assert!(!app.editor.has_unsaved_changes());

        press(&mut app, KeyCode::Char('n'));
        assert!(app.confirm.is_none());
        assert!(app.editor.persisted_id().is_none());
    }

    #[test]
    fn test_new_template_asks_before_discarding() {
        let (mut app, _rt) = test_app();
        app.editor.add_block(Block::text("draft"));
        press(&mut app, KeyCode::Char('n'));
        assert!(app.confirm.is_some());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.editor.template().blocks.len(), 1);

        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.editor.template().blocks.is_empty());
    }

    #[test]
    fn test_opening_foreign_template_returns_to_profile() {
        let (mut app, _rt) = test_app();
        let mut theirs = Template::new();
        theirs.title = "Theirs".to_string();
        let id = app
            .db
            .create(&theirs, Some(&Owner::new("someone-else")))
            .unwrap();

        app.guard(PendingAction::Open(id));
        assert_eq!(app.screen, Screen::Profile);
        assert_eq!(
            app.notice.as_ref().map(|n| n.level),
            Some(NoticeLevel::Error)
        );
        assert!(app.editor.persisted_id().is_none());
    }

    #[test]
    fn test_delete_from_profile() {
        let (mut app, _rt) = test_app();
        complete_template(&mut app);
        app.save();
        app.switch_screen(Screen::Profile);

        press(&mut app, KeyCode::Char('d'));
        assert!(app.confirm.is_some());
        press(&mut app, KeyCode::Char('y'));
        assert!(app.profile.is_empty());
        assert!(app.editor.persisted_id().is_none());
    }

    #[test]
    fn test_stale_autocomplete_is_discarded() {
        let (mut app, _rt) = test_app();
        app.begin_add_block(BlockType::Text);
        let block_id = app.block_editor.as_ref().unwrap().block_id.clone();
        app.autocomplete_seq = 2;

        let completion = Completion {
            text: "Write a poem".to_string(),
            explanation: String::new(),
        };
        app.handle_ai_event(AiEvent::Autocomplete {
            seq: 1,
            block_id: block_id.clone(),
            result: Ok(vec![completion.clone()]),
        });
        assert!(app.block_editor.as_ref().unwrap().completions.is_empty());

        app.handle_ai_event(AiEvent::Autocomplete {
            seq: 2,
            block_id: "other".to_string(),
            result: Ok(vec![completion.clone()]),
        });
        assert!(app.block_editor.as_ref().unwrap().completions.is_empty());

        app.handle_ai_event(AiEvent::Autocomplete {
            seq: 2,
            block_id,
            result: Ok(vec![completion]),
        });
        assert_eq!(app.block_editor.as_ref().unwrap().completions.len(), 1);
    }

    #[test]
    fn test_autocomplete_from_closed_editor_is_discarded() {
        let (mut app, _rt) = test_app();
        let block = Block::text("Summarize");
        let block_id = block.id.clone();
        app.editor.add_block(block);

        app.begin_edit_block();
        let start = Instant::now();
        {
            let state = app.block_editor.as_mut().unwrap();
            state.content.set("Summarize the");
            state.autocomplete_pending_since = Some(start);
        }
        app.tick(start + Duration::from_secs(1));
        let in_flight = app.autocomplete_seq;

        press(&mut app, KeyCode::Esc);
        assert!(app.block_editor.is_none());
        app.begin_edit_block();
        assert_eq!(app.block_editor.as_ref().unwrap().block_id, block_id);

        app.handle_ai_event(AiEvent::Autocomplete {
            seq: in_flight,
            block_id,
            result: Ok(vec![Completion {
                text: "Summarize the article".to_string(),
                explanation: String::new(),
            }]),
        });
        assert!(app.block_editor.as_ref().unwrap().completions.is_empty());
    }

    #[test]
    fn test_tick_fires_autocomplete_after_debounce() {
        let (mut app, _rt) = test_app();
        app.begin_add_block(BlockType::Text);
        let start = Instant::now();
        {
            let state = app.block_editor.as_mut().unwrap();
            state.content.set("Summ");
            state.autocomplete_pending_since = Some(start);
        }

        app.tick(start + Duration::from_millis(100));
        assert_eq!(app.autocomplete_seq, 0);

        app.tick(start + Duration::from_millis(600));
        assert_eq!(app.autocomplete_seq, 1);
        let state = app.block_editor.as_ref().unwrap();
        assert!(state.autocomplete_loading);
        assert!(state.autocomplete_pending_since.is_none());
    }

    #[test]
    fn test_tick_skips_short_input() {
        let (mut app, _rt) = test_app();
        app.begin_add_block(BlockType::Text);
        let start = Instant::now();
        {
            let state = app.block_editor.as_mut().unwrap();
            state.content.set("ab");
            state.autocomplete_pending_since = Some(start);
        }
        app.tick(start + Duration::from_secs(1));
        assert_eq!(app.autocomplete_seq, 0);
    }

    #[test]
    fn test_suggestion_results_clear_loading_and_can_be_applied() {
        let (mut app, _rt) = test_app();
        app.editor.add_block(Block::text("Summarize"));
        app.open_ai_panel();
        assert!(app.suggestions_loading);

        app.handle_ai_event(AiEvent::Suggestions {
            generation: app.editor_generation,
            revision: app.editor.revision(),
            result: Ok(vec![Suggestion {
                kind: crate::suggest::SuggestionKind::Clarity,
                text: "Name the audience".to_string(),
                explanation: None,
            }]),
        });
        assert!(!app.suggestions_loading);
        assert!(!app.suggestions_outdated());

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.editor.template().blocks.len(), 2);
        assert!(app.suggestions_outdated());
    }

    #[test]
    fn test_suggestions_for_previous_template_are_dropped() {
        let (mut app, _rt) = test_app();
        app.editor.add_block(Block::text("First template"));
        app.editor.add_block(Block::text("second block"));
        app.request_suggestions();
        let stale_generation = app.editor_generation;
        let stale_revision = app.editor.revision();

        app.guard(PendingAction::NewTemplate);
        press(&mut app, KeyCode::Char('y'));
        assert!(!app.suggestions_loading);
        app.editor.add_block(Block::text("Other template"));
        app.editor.add_block(Block::text("another block"));
        assert_eq!(app.editor.revision(), stale_revision);

        app.handle_ai_event(AiEvent::Suggestions {
            generation: stale_generation,
            revision: stale_revision,
            result: Ok(vec![Suggestion {
                kind: crate::suggest::SuggestionKind::Clarity,
                text: "About the first template".to_string(),
                explanation: None,
            }]),
        });
        assert!(app.suggestions.is_empty());
        assert!(!app.suggestions_outdated());

        app.handle_ai_event(AiEvent::Examples {
            generation: stale_generation,
            result: Ok(vec![Example {
                input: "Old input".to_string(),
                output: "Old output".to_string(),
                explanation: String::new(),
            }]),
        });
        assert!(app.examples.is_empty());
    }

    #[test]
    fn test_quota_error_becomes_warning_notice() {
        let (mut app, _rt) = test_app();
        app.examples_loading = true;
        app.handle_ai_event(AiEvent::Examples {
            generation: app.editor_generation,
            result: Err(PromptError::QuotaExceeded { limit: 100 }),
        });
        assert!(!app.examples_loading);
        assert_eq!(
            app.notice.as_ref().map(|n| n.level),
            Some(NoticeLevel::Warning)
        );
    }

    #[test]
    fn test_notice_expires() {
        let (mut app, _rt) = test_app();
        app.notify("hello");
        let shown = app.notice.as_ref().unwrap().shown_at;
        app.tick(shown + Duration::from_secs(1));
        assert!(app.notice.is_some());
        app.tick(shown + NOTICE_TTL);
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_chat_post_and_channel_switch() {
        let (mut app, _rt) = test_app();
        press(&mut app, KeyCode::F(5));
        type_text(&mut app, "q is just text here #tips");
        press(&mut app, KeyCode::Enter);
        assert!(!app.should_quit);
        assert_eq!(app.chat_messages.len(), 2);
        assert_eq!(app.chat_messages[1].tags, vec!["tips".to_string()]);
        assert!(app.chat_input.value().is_empty());

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.chat_channel, 1);
        assert_eq!(app.chat_messages.len(), 1);
    }

    #[test]
    fn test_gallery_search_filters() {
        let (mut app, _rt) = test_app();
        complete_template(&mut app);
        app.save();
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.gallery.len(), 1);

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "zzz");
        assert!(app.gallery.is_empty());
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.gallery.len(), 1);
    }

    #[test]
    fn test_quit_guarded_by_unsaved_changes() {
        let (mut app, _rt) = test_app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);

        let (mut app, _rt) = test_app();
        app.editor.add_block(Block::text("draft"));
        ctrl(&mut app, 'q');
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Char('y'));
        assert!(app.should_quit);
    }
}
