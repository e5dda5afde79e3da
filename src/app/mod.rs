use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEvent};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::core::{Command, LineInput, NoteList, Selectable, TextBuffer, TextField};
use crate::input::map_key_event;
use crate::io::{IoError, NoteFile, NoteStore, SaveError};
use crate::suggest::{GeminiProvider, Suggester, SuggestionEvent, SuggestionProvider};
use crate::ui::{UiModel, body_size, draw};

const NO_SELECTION: &str = "No item selected. Use arrow keys to select a note.";

/// Where the new-note prompt returns to when cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTo {
    Idle,
    List,
}

#[derive(Debug)]
pub struct OpenNote {
    pub title: String,
    file: NoteFile,
}

/// The primary focus. The open note only exists inside `Editor`.
#[derive(Debug)]
pub enum View {
    Idle,
    List,
    NewNote { return_to: ReturnTo },
    Editor(OpenNote),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

pub struct App {
    pub view: View,
    pub editor: TextBuffer,
    pub name_input: LineInput,
    pub notes: NoteList,
    pub status: Option<StatusLine>,
    pub suggestion: Option<String>,
    pub autocomplete: bool,
    pub width: u16,
    pub height: u16,
    pub running: bool,
    pub needs_redraw: bool,
    suggestion_token: u64,
    in_flight: Option<u64>,
    quit_error: Option<SaveError>,
    store: NoteStore,
    suggester: Suggester,
}

impl App {
    pub fn new(store: NoteStore, suggester: Suggester) -> Self {
        Self {
            view: View::Idle,
            editor: TextBuffer::default(),
            name_input: LineInput::default(),
            notes: NoteList::default(),
            status: None,
            suggestion: None,
            autocomplete: false,
            width: 80,
            height: 24,
            running: true,
            needs_redraw: true,
            suggestion_token: 0,
            in_flight: None,
            quit_error: None,
            store,
            suggester,
        }
    }

    pub fn is_note_open(&self) -> bool {
        matches!(self.view, View::Editor(_))
    }

    fn set_error(&mut self, msg: impl Into<String>) {
        let text = msg.into();
        tracing::warn!("{text}");
        self.status = Some(StatusLine {
            kind: StatusKind::Error,
            text,
        });
    }

    fn set_info(&mut self, msg: impl Into<String>) {
        self.status = Some(StatusLine {
            kind: StatusKind::Info,
            text: msg.into(),
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Invalidates every suggestion request issued so far.
    fn reset_suggestions(&mut self) {
        self.suggestion_token += 1;
        self.in_flight = None;
        self.suggestion = None;
    }

    fn refresh_notes(&mut self) {
        match self.store.list() {
            Ok(notes) => {
                tracing::debug!(dir = %self.store.dir().display(), count = notes.len(), "listed notes");
                self.notes.set_items(notes);
            }
            Err(e) => {
                self.notes.set_items(Vec::new());
                self.set_error(format!("Could not list notes: {e}"));
            }
        }
    }

    fn open_note(&mut self, title: &str) -> Result<(), IoError> {
        let path = self.store.note_path(title);
        let (file, content) = self.store.open_or_create(&path)?;
        self.editor.set_value(&content);
        self.view = View::Editor(OpenNote {
            title: title.to_string(),
            file,
        });
        self.reset_suggestions();
        self.clear_status();
        tracing::info!(title, "opened note");
        Ok(())
    }

    /// Saves and closes the open note, leaving the view `Idle`. Returns
    /// `false` (and keeps the note open) when the save fails.
    fn close_note(&mut self) -> bool {
        let View::Editor(mut open) = std::mem::replace(&mut self.view, View::Idle) else {
            return true;
        };
        if let Err(e) = open.file.write_contents(&self.editor.value()) {
            self.view = View::Editor(open);
            self.set_error(e.to_string());
            return false;
        }
        tracing::info!(title = %open.title, "closed note");
        drop(open);
        self.editor.set_value("");
        self.reset_suggestions();
        true
    }

    fn save_in_place(&mut self) {
        let content = self.editor.value();
        let View::Editor(open) = &mut self.view else {
            return;
        };
        match open.file.write_contents(&content) {
            Ok(()) => {
                tracing::debug!(path = %open.file.path().display(), "saved note");
                self.editor.mark_saved();
                self.set_info("Saved");
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(cmd) = map_key_event(key) {
            self.handle_command(cmd);
        }
    }

    pub fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Quit => self.quit(),
            Command::OpenList => self.show_list(),
            Command::NewNote => self.show_new_note_prompt(),
            _ => match self.view {
                View::Idle => {}
                View::List => self.handle_list_command(cmd),
                View::NewNote { return_to } => self.handle_prompt_command(cmd, return_to),
                View::Editor(_) => self.handle_editor_command(cmd),
            },
        }
        self.needs_redraw = true;
    }

    fn quit(&mut self) {
        if let View::Editor(open) = std::mem::replace(&mut self.view, View::Idle) {
            if let Err(e) = self.store.save(open.file, &self.editor.value()) {
                tracing::error!("saving {} on quit failed: {e}", open.title);
                self.quit_error = Some(e);
            }
        }
        self.running = false;
    }

    fn show_list(&mut self) {
        if !self.close_note() {
            return;
        }
        self.clear_status();
        self.notes.clear_filter();
        self.refresh_notes();
        self.view = View::List;
    }

    fn show_new_note_prompt(&mut self) {
        let return_to = if matches!(self.view, View::List) {
            ReturnTo::List
        } else {
            ReturnTo::Idle
        };
        if !self.close_note() {
            return;
        }
        self.name_input.set_value("");
        self.view = View::NewNote { return_to };
        self.clear_status();
    }

    fn handle_list_command(&mut self, cmd: Command) {
        if self.notes.is_filtering() {
            match cmd {
                Command::Insert(c) => self.notes.push_filter(c),
                Command::Backspace => self.notes.pop_filter(),
                Command::Confirm => self.notes.apply_filter(),
                Command::Cancel => self.notes.clear_filter(),
                Command::MoveUp => self.notes.move_selection(-1),
                Command::MoveDown => self.notes.move_selection(1),
                _ => {}
            }
            return;
        }

        match cmd {
            Command::MoveUp => self.notes.move_selection(-1),
            Command::MoveDown => self.notes.move_selection(1),
            Command::Insert('/') => self.notes.start_filter(),
            Command::Cancel => {
                self.view = View::Idle;
                self.clear_status();
            }
            Command::Confirm => {
                let Some(title) = self.notes.selected().map(|n| n.title.clone()) else {
                    self.set_error(NO_SELECTION);
                    return;
                };
                if let Err(e) = self.open_note(&title) {
                    self.set_error(format!("Error opening file: {e}"));
                }
            }
            Command::Delete | Command::Backspace => {
                let Some(title) = self.notes.selected().map(|n| n.title.clone()) else {
                    self.set_error(NO_SELECTION);
                    return;
                };
                let path = self.store.note_path(&title);
                match self.store.delete(&path) {
                    Ok(()) => {
                        self.clear_status();
                        self.refresh_notes();
                    }
                    Err(e) => self.set_error(format!("Error deleting file: {e}")),
                }
            }
            _ => {}
        }
    }

    fn handle_prompt_command(&mut self, cmd: Command, return_to: ReturnTo) {
        match cmd {
            Command::Insert(c) => self.name_input.push(c),
            Command::Backspace => self.name_input.pop(),
            Command::Cancel => {
                self.name_input.set_value("");
                self.clear_status();
                self.view = match return_to {
                    ReturnTo::Idle => View::Idle,
                    ReturnTo::List => {
                        self.refresh_notes();
                        View::List
                    }
                };
            }
            Command::Confirm => {
                let name = self.name_input.value().trim().to_string();
                if name.is_empty() {
                    self.set_error("Note name cannot be empty");
                    return;
                }
                match self.open_note(&name) {
                    Ok(()) => self.name_input.set_value(""),
                    Err(e) => self.set_error(format!("Error creating/opening file: {e}")),
                }
            }
            _ => {}
        }
    }

    fn handle_editor_command(&mut self, cmd: Command) {
        match cmd {
            Command::Save => self.save_in_place(),
            Command::Cancel => {
                if self.close_note() {
                    self.clear_status();
                }
            }
            Command::ToggleAutocomplete => self.toggle_autocomplete(),
            Command::RefreshSuggestion => {
                if self.autocomplete {
                    self.request_suggestion();
                }
            }
            Command::Tab => {
                if self.suggestion.as_deref().is_some_and(|s| !s.is_empty()) {
                    self.accept_suggestion();
                } else {
                    self.editor.insert_char('\t');
                }
            }
            Command::Insert(' ') => {
                self.editor.insert_char(' ');
                if self.autocomplete && self.suggestion.is_none() && self.in_flight.is_none() {
                    self.request_suggestion();
                }
            }
            Command::Insert(c) => self.editor.insert_char(c),
            Command::Confirm => self.editor.insert_newline(),
            Command::Backspace => self.editor.backspace(),
            Command::Delete => self.editor.delete(),
            Command::MoveLeft => self.editor.move_left(),
            Command::MoveRight => self.editor.move_right(),
            Command::MoveUp => self.editor.move_up(),
            Command::MoveDown => self.editor.move_down(),
            Command::MoveHome => self.editor.move_home(),
            Command::MoveEnd => self.editor.move_end(),
            Command::PageUp => self.editor.page_up(),
            Command::PageDown => self.editor.page_down(),
            Command::Quit | Command::OpenList | Command::NewNote => {}
        }
    }

    fn toggle_autocomplete(&mut self) {
        self.autocomplete = !self.autocomplete;
        if self.autocomplete {
            if !self.suggester.is_available() {
                tracing::info!("autocomplete enabled without a provider");
            }
            self.set_info("Autocomplete enabled");
        } else {
            self.reset_suggestions();
            self.set_info("Autocomplete disabled");
        }
        tracing::debug!(enabled = self.autocomplete, "toggled autocomplete");
    }

    fn request_suggestion(&mut self) {
        self.in_flight = Some(self.suggestion_token);
        self.suggester
            .dispatch(self.suggestion_token, self.editor.value());
    }

    fn accept_suggestion(&mut self) {
        let Some(text) = self.suggestion.take() else {
            return;
        };
        if self.editor.is_empty() || self.editor.ends_with_whitespace() {
            self.editor.append_str(&text);
        } else {
            self.editor.append_str(&format!(" {text}"));
        }
    }

    /// Applies a finished request unless it belongs to an earlier note or
    /// an autocomplete session that has since been switched off.
    pub fn handle_suggestion(&mut self, event: SuggestionEvent) {
        if !self.is_note_open() || event.token != self.suggestion_token {
            tracing::debug!(
                token = event.token,
                current = self.suggestion_token,
                "discarding stale suggestion"
            );
            return;
        }
        self.in_flight = None;
        match event.result {
            Ok(text) => {
                self.suggestion = Some(text);
                self.clear_status();
            }
            Err(e) => {
                self.suggestion = None;
                self.set_error(format!("Suggestion error: {e}"));
            }
        }
        self.needs_redraw = true;
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let (body_w, body_h) = body_size(width, height);
        self.editor.resize(body_w, body_h);
        self.name_input.resize(body_w, 1);
        self.notes.resize(body_w, body_h);
        self.needs_redraw = true;
    }

    fn help_line(&self) -> &'static str {
        match self.view {
            View::List => {
                "Ctrl+N: New Note • Esc: Return to home • Ctrl+C: Quit • Delete/Backspace: Delete Note • Enter: Open Note • /: Filter"
            }
            View::Editor(_) => {
                "Ctrl+N: New Note • Ctrl+L: List all Notes • Esc: Return to home • Ctrl+S: Save Note • Ctrl+C: Quit"
            }
            View::Idle | View::NewNote { .. } => {
                "Ctrl+N: New Note • Ctrl+L: List all Notes • Esc: Return to home • Ctrl+C: Quit"
            }
        }
    }

    pub fn ui_model(&self) -> UiModel<'_> {
        UiModel {
            view: &self.view,
            editor: &self.editor,
            name_input: &self.name_input,
            notes: &self.notes,
            status: self.status.as_ref(),
            suggestion: self.suggestion.as_deref(),
            autocomplete: self.autocomplete,
            help: self.help_line(),
        }
    }
}

fn build_provider(config: &Config) -> Option<Arc<dyn SuggestionProvider>> {
    let Some(api_key) = config.api_key.clone() else {
        tracing::info!("API key is not set, AI suggestions are disabled");
        return None;
    };
    match GeminiProvider::new(api_key, config.model.clone()) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            tracing::warn!("failed to initialise the suggestion client: {e}");
            None
        }
    }
}

fn init_logging(path: &Path) {
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => file,
        Err(_) => return,
    };
    let filter =
        EnvFilter::try_from_env("TOTION_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

pub fn run() -> Result<()> {
    let config = Config::from_cli(Cli::parse())?;
    init_logging(&config.log_file);
    fs::create_dir_all(&config.notes_dir).with_context(|| {
        format!(
            "could not create notes directory {}",
            config.notes_dir.display()
        )
    })?;
    tracing::info!(notes_dir = %config.notes_dir.display(), "starting");

    let (tx, rx) = mpsc::channel();
    let suggester = Suggester::new(build_provider(&config), tx);
    let mut app = App::new(NoteStore::new(&config.notes_dir), suggester);

    let (_guard, mut terminal) = setup_terminal()?;
    let size = terminal.size()?;
    app.resize(size.width, size.height);

    event_loop(&mut app, &mut terminal, &rx)?;

    terminal.show_cursor().context("show cursor")?;
    if let Some(e) = app.quit_error.take() {
        return Err(e).context("saving the open note on quit");
    }
    tracing::info!("bye");
    Ok(())
}

fn event_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    suggestions: &Receiver<SuggestionEvent>,
) -> Result<()> {
    while app.running {
        while let Ok(event) = suggestions.try_recv() {
            app.handle_suggestion(event);
        }

        if app.needs_redraw {
            terminal.draw(|f| draw(f, app.ui_model()))?;
            app.needs_redraw = false;
        }

        if event::poll(Duration::from_millis(120))? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key),
                Event::Resize(w, h) => app.resize(w, h),
                _ => {}
            }
        }
    }
    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

fn setup_terminal() -> Result<(TerminalGuard, Terminal<CrosstermBackend<io::Stdout>>)> {
    enable_raw_mode().context("enabling raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen).context("enter alternate screen")?;

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        hook(panic_info);
    }));

    let guard = TerminalGuard;
    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend).context("creating terminal")?;
    Ok((guard, terminal))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;

    use tempfile::{TempDir, tempdir};

    use super::{App, ReturnTo, StatusKind, View};
    use crate::core::{Command, TextField};
    use crate::io::{NoteFile, NoteStore};
    use crate::suggest::tests::CannedProvider;
    use crate::suggest::{SuggestError, Suggester, SuggestionEvent, SuggestionProvider};

    fn app_with(
        dir: &Path,
        provider: Option<Arc<dyn SuggestionProvider>>,
    ) -> (App, Receiver<SuggestionEvent>) {
        let (tx, rx) = mpsc::channel();
        let app = App::new(NoteStore::new(dir), Suggester::new(provider, tx));
        (app, rx)
    }

    fn setup() -> (TempDir, App, Receiver<SuggestionEvent>) {
        let dir = tempdir().expect("tempdir");
        let (app, rx) = app_with(dir.path(), None);
        (dir, app, rx)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_command(Command::Insert(c));
        }
    }

    fn create_note(app: &mut App, name: &str) {
        app.handle_command(Command::NewNote);
        type_text(app, name);
        app.handle_command(Command::Confirm);
        assert!(app.is_note_open(), "note {name} should be open");
    }

    fn open_title(app: &App) -> Option<&str> {
        match &app.view {
            View::Editor(open) => Some(open.title.as_str()),
            _ => None,
        }
    }

    /// Swaps the open note's handle for one that cannot be written.
    fn lock_open_note(app: &mut App, path: &Path) {
        let View::Editor(open) = &mut app.view else {
            panic!("no note open");
        };
        open.file = NoteFile::read_only(path).expect("read-only handle");
    }

    fn error_text(app: &App) -> Option<&str> {
        app.status
            .as_ref()
            .filter(|s| s.kind == StatusKind::Error)
            .map(|s| s.text.as_str())
    }

    fn next_event(rx: &Receiver<SuggestionEvent>) -> SuggestionEvent {
        rx.recv_timeout(Duration::from_secs(5)).expect("suggestion event")
    }

    #[test]
    fn starts_idle_without_status() {
        let (_dir, app, _rx) = setup();
        assert!(matches!(app.view, View::Idle));
        assert!(app.status.is_none());
        assert!(app.suggestion.is_none());
        assert!(!app.autocomplete);
        assert!(app.running);
    }

    #[test]
    fn new_note_typed_and_saved_lands_on_disk() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "x");
        assert_eq!(open_title(&app), Some("x"));
        type_text(&mut app, "hello");
        app.handle_command(Command::Save);

        assert_eq!(
            fs::read_to_string(dir.path().join("x.md")).expect("read"),
            "hello"
        );
        assert!(app.is_note_open());
        assert!(!app.editor.dirty);
    }

    #[test]
    fn clearing_existing_note_truncates_file() {
        let (dir, mut app, _rx) = setup();
        fs::write(dir.path().join("old.md"), "old").expect("write");
        app.handle_command(Command::OpenList);
        app.handle_command(Command::Confirm);
        assert_eq!(app.editor.value(), "old");

        app.editor.set_value("");
        app.handle_command(Command::Cancel);
        assert!(matches!(app.view, View::Idle));
        assert_eq!(fs::read(dir.path().join("old.md")).expect("read").len(), 0);
    }

    #[test]
    fn cancel_in_editor_saves_and_clears_state() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "draft");
        type_text(&mut app, "abc");
        app.handle_command(Command::Cancel);

        assert!(matches!(app.view, View::Idle));
        assert!(open_title(&app).is_none());
        assert_eq!(app.editor.value(), "");
        assert_eq!(
            fs::read_to_string(dir.path().join("draft.md")).expect("read"),
            "abc"
        );
    }

    #[test]
    fn open_list_saves_open_note_first() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "first");
        type_text(&mut app, "body");
        app.handle_command(Command::OpenList);

        assert!(matches!(app.view, View::List));
        assert_eq!(
            fs::read_to_string(dir.path().join("first.md")).expect("read"),
            "body"
        );
        let titles: Vec<&str> = app
            .notes
            .visible()
            .into_iter()
            .map(|n| n.title.as_str())
            .collect();
        assert_eq!(titles, vec!["first"]);
    }

    #[test]
    fn list_shows_only_markdown_notes() {
        let (dir, mut app, _rx) = setup();
        fs::write(dir.path().join("a.md"), "").expect("write");
        fs::write(dir.path().join("b.md"), "").expect("write");
        fs::write(dir.path().join("c.txt"), "").expect("write");
        app.handle_command(Command::OpenList);

        let mut titles: Vec<String> = app
            .notes
            .visible()
            .into_iter()
            .map(|n| n.title.clone())
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn confirm_in_list_opens_selected_note() {
        let (dir, mut app, _rx) = setup();
        fs::write(dir.path().join("a.md"), "alpha").expect("write");
        fs::write(dir.path().join("b.md"), "beta").expect("write");
        app.handle_command(Command::OpenList);
        app.handle_command(Command::MoveDown);
        app.handle_command(Command::Confirm);

        assert_eq!(open_title(&app), Some("b"));
        assert_eq!(app.editor.value(), "beta");
        assert!(app.status.is_none());
    }

    #[test]
    fn confirm_or_delete_without_selection_sets_error() {
        let (_dir, mut app, _rx) = setup();
        app.handle_command(Command::OpenList);
        app.handle_command(Command::Confirm);
        assert!(matches!(app.view, View::List));
        assert_eq!(error_text(&app), Some(super::NO_SELECTION));

        app.handle_command(Command::Delete);
        assert!(matches!(app.view, View::List));
        assert_eq!(error_text(&app), Some(super::NO_SELECTION));
    }

    #[test]
    fn delete_removes_note_and_refreshes() {
        let (dir, mut app, _rx) = setup();
        fs::write(dir.path().join("gone.md"), "x").expect("write");
        fs::write(dir.path().join("kept.md"), "y").expect("write");
        app.handle_command(Command::OpenList);
        app.handle_command(Command::Backspace);

        assert!(!dir.path().join("gone.md").exists());
        assert!(dir.path().join("kept.md").exists());
        assert_eq!(app.notes.visible().len(), 1);
        assert!(matches!(app.view, View::List));
        assert!(app.status.is_none());
    }

    #[test]
    fn delete_failure_is_reported() {
        let (dir, mut app, _rx) = setup();
        fs::write(dir.path().join("racy.md"), "x").expect("write");
        app.handle_command(Command::OpenList);
        fs::remove_file(dir.path().join("racy.md")).expect("remove");
        app.handle_command(Command::Delete);

        assert!(
            error_text(&app).is_some_and(|t| t.starts_with("Error deleting file")),
            "{:?}",
            app.status
        );
        assert!(matches!(app.view, View::List));
    }

    #[test]
    fn unreadable_directory_degrades_to_empty_list() {
        let dir = tempdir().expect("tempdir");
        let (mut app, _rx) = app_with(&dir.path().join("missing"), None);
        app.handle_command(Command::OpenList);

        assert!(matches!(app.view, View::List));
        assert!(app.notes.is_empty());
        assert!(error_text(&app).is_some_and(|t| t.starts_with("Could not list notes")));
        assert!(app.running);
    }

    #[test]
    fn backspace_while_filtering_edits_filter() {
        let (dir, mut app, _rx) = setup();
        fs::write(dir.path().join("groceries.md"), "").expect("write");
        fs::write(dir.path().join("reading.md"), "").expect("write");
        app.handle_command(Command::OpenList);
        type_text(&mut app, "/gx");
        assert!(app.notes.visible().is_empty());

        app.handle_command(Command::Backspace);
        assert_eq!(app.notes.filter(), "g");
        assert!(dir.path().join("groceries.md").exists());
        assert!(dir.path().join("reading.md").exists());

        app.handle_command(Command::Cancel);
        assert!(matches!(app.view, View::List));
        assert_eq!(app.notes.visible().len(), 2);

        app.handle_command(Command::Cancel);
        assert!(matches!(app.view, View::Idle));
    }

    #[test]
    fn cancel_with_applied_filter_goes_idle() {
        let (dir, mut app, _rx) = setup();
        fs::write(dir.path().join("groceries.md"), "").expect("write");
        app.handle_command(Command::OpenList);
        type_text(&mut app, "/gro");
        app.handle_command(Command::Confirm);
        assert!(!app.notes.is_filtering());
        assert_eq!(app.notes.filter(), "gro");

        app.handle_command(Command::Cancel);
        assert!(matches!(app.view, View::Idle));
    }

    #[test]
    fn empty_note_name_is_rejected() {
        let (_dir, mut app, _rx) = setup();
        app.handle_command(Command::NewNote);
        type_text(&mut app, "   ");
        app.handle_command(Command::Confirm);

        assert!(matches!(app.view, View::NewNote { .. }));
        assert_eq!(error_text(&app), Some("Note name cannot be empty"));
    }

    #[test]
    fn new_note_name_is_trimmed() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "  spaced  ");
        assert_eq!(open_title(&app), Some("spaced"));
        assert!(dir.path().join("spaced.md").exists());
        assert_eq!(app.name_input.value(), "");
    }

    #[test]
    fn cancelling_prompt_returns_to_prior_view() {
        let (_dir, mut app, _rx) = setup();
        app.handle_command(Command::NewNote);
        app.handle_command(Command::Cancel);
        assert!(matches!(app.view, View::Idle));

        app.handle_command(Command::OpenList);
        app.handle_command(Command::NewNote);
        assert!(matches!(
            app.view,
            View::NewNote {
                return_to: ReturnTo::List
            }
        ));
        app.handle_command(Command::Cancel);
        assert!(matches!(app.view, View::List));
    }

    #[test]
    fn new_note_from_editor_saves_current_note() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "one");
        type_text(&mut app, "first");
        app.handle_command(Command::NewNote);

        assert!(matches!(
            app.view,
            View::NewNote {
                return_to: ReturnTo::Idle
            }
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("one.md")).expect("read"),
            "first"
        );
    }

    #[test]
    fn confirm_in_editor_inserts_newline() {
        let (_dir, mut app, _rx) = setup();
        create_note(&mut app, "lines");
        type_text(&mut app, "a");
        app.handle_command(Command::Confirm);
        type_text(&mut app, "b");
        assert_eq!(app.editor.value(), "a\nb");
        assert_eq!(open_title(&app), Some("lines"));
    }

    #[test]
    fn quit_saves_open_note() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "last");
        type_text(&mut app, "words");
        app.handle_command(Command::Quit);

        assert!(!app.running);
        assert!(app.quit_error.is_none());
        assert_eq!(
            fs::read_to_string(dir.path().join("last.md")).expect("read"),
            "words"
        );
    }

    #[test]
    fn failed_save_keeps_note_open_when_leaving() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "locked");
        type_text(&mut app, "keep me");
        lock_open_note(&mut app, &dir.path().join("locked.md"));

        app.handle_command(Command::Cancel);
        assert_eq!(open_title(&app), Some("locked"));
        assert_eq!(app.editor.value(), "keep me");
        assert!(error_text(&app).is_some_and(|t| t.starts_with("Truncate error")));

        app.handle_command(Command::OpenList);
        assert!(matches!(app.view, View::Editor(_)));
        assert_eq!(app.editor.value(), "keep me");

        app.handle_command(Command::NewNote);
        assert!(matches!(app.view, View::Editor(_)));
    }

    #[test]
    fn failed_save_in_place_keeps_buffer_dirty() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "locked");
        type_text(&mut app, "draft");
        lock_open_note(&mut app, &dir.path().join("locked.md"));

        app.handle_command(Command::Save);
        assert!(app.editor.dirty);
        assert_eq!(app.editor.value(), "draft");
        assert!(error_text(&app).is_some_and(|t| t.starts_with("Truncate error")));
        assert_eq!(fs::read(dir.path().join("locked.md")).expect("read").len(), 0);
    }

    #[test]
    fn failed_save_on_quit_is_recorded() {
        let (dir, mut app, _rx) = setup();
        create_note(&mut app, "locked");
        type_text(&mut app, "lost");
        lock_open_note(&mut app, &dir.path().join("locked.md"));

        app.handle_command(Command::Quit);
        assert!(!app.running);
        assert!(app.quit_error.is_some());
    }

    #[test]
    fn editing_crlf_note_keeps_line_endings() {
        let (dir, mut app, _rx) = setup();
        fs::write(dir.path().join("w.md"), "abc\r\ndef\r\n").expect("write");
        app.handle_command(Command::OpenList);
        app.handle_command(Command::Confirm);
        app.handle_command(Command::MoveEnd);
        app.handle_command(Command::Insert('X'));
        app.handle_command(Command::Save);

        assert_eq!(
            fs::read(dir.path().join("w.md")).expect("read"),
            b"abcX\r\ndef\r\n"
        );
    }

    #[test]
    fn toggle_only_applies_with_open_note() {
        let (_dir, mut app, _rx) = setup();
        app.handle_command(Command::ToggleAutocomplete);
        assert!(!app.autocomplete);

        create_note(&mut app, "n");
        app.handle_command(Command::ToggleAutocomplete);
        assert!(app.autocomplete);
        assert_eq!(
            app.status.as_ref().map(|s| s.text.as_str()),
            Some("Autocomplete enabled")
        );
    }

    #[test]
    fn space_requests_suggestion_and_tab_accepts_it() {
        let dir = tempdir().expect("tempdir");
        let (mut app, rx) = app_with(dir.path(), Some(Arc::new(CannedProvider::new("world"))));
        create_note(&mut app, "s");
        app.handle_command(Command::ToggleAutocomplete);
        type_text(&mut app, "hello");
        app.handle_command(Command::Insert(' '));
        assert_eq!(app.editor.value(), "hello ");

        app.handle_suggestion(next_event(&rx));
        assert_eq!(app.suggestion.as_deref(), Some("world"));

        app.handle_command(Command::Tab);
        assert_eq!(app.editor.value(), "hello world");
        assert!(app.suggestion.is_none());

        app.handle_command(Command::Tab);
        assert_eq!(app.editor.value(), "hello world\t");
    }

    #[test]
    fn accepted_suggestion_gets_separating_space() {
        let dir = tempdir().expect("tempdir");
        let (mut app, rx) = app_with(dir.path(), Some(Arc::new(CannedProvider::new("there"))));
        create_note(&mut app, "s");
        app.handle_command(Command::ToggleAutocomplete);
        type_text(&mut app, "hi");
        app.handle_command(Command::RefreshSuggestion);
        app.handle_suggestion(next_event(&rx));
        app.handle_command(Command::Tab);
        assert_eq!(app.editor.value(), "hi there");
    }

    #[test]
    fn tab_without_suggestion_is_plain_input() {
        let (_dir, mut app, _rx) = setup();
        create_note(&mut app, "t");
        app.handle_command(Command::Tab);
        assert_eq!(app.editor.value(), "\t");
    }

    #[test]
    fn no_request_when_autocomplete_disabled() {
        let dir = tempdir().expect("tempdir");
        let (mut app, rx) = app_with(dir.path(), Some(Arc::new(CannedProvider::new("x"))));
        create_note(&mut app, "quiet");
        app.handle_command(Command::Insert(' '));
        app.handle_command(Command::RefreshSuggestion);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn missing_provider_surfaces_unavailable_error() {
        let (_dir, mut app, rx) = setup();
        create_note(&mut app, "n");
        app.handle_command(Command::ToggleAutocomplete);
        app.handle_command(Command::RefreshSuggestion);
        app.handle_suggestion(next_event(&rx));

        assert!(app.suggestion.is_none());
        assert_eq!(
            error_text(&app),
            Some("Suggestion error: provider unavailable")
        );
        assert!(app.is_note_open());
    }

    #[test]
    fn stale_suggestion_after_switching_notes_is_dropped() {
        let dir = tempdir().expect("tempdir");
        let (mut app, rx) = app_with(dir.path(), Some(Arc::new(CannedProvider::new("late"))));
        create_note(&mut app, "first");
        app.handle_command(Command::ToggleAutocomplete);
        app.handle_command(Command::RefreshSuggestion);
        let event = next_event(&rx);

        create_note(&mut app, "second");
        app.handle_suggestion(event);
        assert!(app.suggestion.is_none());
    }

    #[test]
    fn suggestion_after_disabling_is_dropped() {
        let dir = tempdir().expect("tempdir");
        let (mut app, rx) = app_with(dir.path(), Some(Arc::new(CannedProvider::new("late"))));
        create_note(&mut app, "n");
        app.handle_command(Command::ToggleAutocomplete);
        app.handle_command(Command::RefreshSuggestion);
        let event = next_event(&rx);

        app.handle_command(Command::ToggleAutocomplete);
        app.handle_suggestion(event);
        assert!(app.suggestion.is_none());
    }

    #[test]
    fn suggestion_with_no_open_note_is_dropped() {
        let (_dir, mut app, _rx) = setup();
        app.handle_suggestion(SuggestionEvent {
            token: 0,
            result: Ok("ghost".to_string()),
        });
        assert!(app.suggestion.is_none());

        app.handle_suggestion(SuggestionEvent {
            token: 0,
            result: Err(SuggestError::Empty),
        });
        assert!(app.status.is_none());
    }

    #[test]
    fn disabling_autocomplete_clears_pending_suggestion() {
        let dir = tempdir().expect("tempdir");
        let (mut app, rx) = app_with(dir.path(), Some(Arc::new(CannedProvider::new("more"))));
        create_note(&mut app, "n");
        app.handle_command(Command::ToggleAutocomplete);
        app.handle_command(Command::RefreshSuggestion);
        app.handle_suggestion(next_event(&rx));
        assert!(app.suggestion.is_some());

        app.handle_command(Command::ToggleAutocomplete);
        assert!(app.suggestion.is_none());
        app.handle_command(Command::Tab);
        assert_eq!(app.editor.value(), "\t");
    }

    #[test]
    fn save_outside_editor_is_noop() {
        let (dir, mut app, _rx) = setup();
        app.handle_command(Command::Save);
        assert!(matches!(app.view, View::Idle));
        assert!(app.status.is_none());
        assert_eq!(fs::read_dir(dir.path()).expect("read_dir").count(), 0);
    }

    #[test]
    fn resize_updates_widgets() {
        let (_dir, mut app, _rx) = setup();
        app.resize(120, 40);
        assert_eq!(app.width, 120);
        assert_eq!(app.height, 40);
        assert_eq!(app.name_input.width, app.notes.width);
        assert!(app.editor.viewport.height >= 1);
    }
}
