use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use chrono::Utc;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use rand::Rng;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use ratatui::{Frame, Terminal, backend::CrosstermBackend};
use tracing::{error, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::config::{Config, load_config};
use crate::crypto::{DataKey, SealedStore};
use crate::error::{GateError, StoreError};
use crate::export::write_export;
use crate::filter::{ActiveView, ViewFilter};
use crate::gate::{GateStatus, LockGate, MIN_PASSWORD_LEN};
use crate::import::{FINAL_STAGE, ImportEvent, ImportLog, ImportSource, run_import};
use crate::logging::init_logging;
use crate::models::{
    CATEGORY_PALETTE, Category, DEFAULT_COLOR, EntryDraft, EntryType, PORTALS, UNCATEGORIZED_ID,
    VaultEntry,
};
use crate::pattern::{PatternPad, Playback, PlaybackFrame};
use crate::storage::{FileStore, KeyValueStore};
use crate::store::{RandomIds, SystemClock, VaultStore, validate_draft};
use crate::ui::{
    FolderRow, GUIDE_STEPS, ImportView, PatternView, UnlockState, ViewState, copy_to_clipboard,
    draw, draw_unlock, guide_lines, pattern_grid, prompt_secret,
};

const STATUS_MESSAGE_SECS: u64 = 2;
const GENERATED_PASSWORD_LEN: usize = 16;
const NAV_HINT: &str = "↑/↓ move | ←/→ focus | / search | n new | e edit | d delete | c copy | v reveal | f folder | i import | o export | w portals | ? guide | Esc quit";

type Term = Terminal<CrosstermBackend<std::io::Stdout>>;

enum Command {
    Tui,
    Import(PathBuf),
    Export(PathBuf),
    List(Option<String>),
}

pub fn run() -> Result<()> {
    let bin_name = executable_name();
    let mut args = std::env::args().skip(1).peekable();
    let mut command = Command::Tui;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("{bin_name} v{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                print_usage(&bin_name);
                return Ok(());
            }
            "-g" | "--generate" => {
                let mut generated = generate_strong_password(GENERATED_PASSWORD_LEN);
                println!("{generated}");
                generated.zeroize();
                return Ok(());
            }
            "-i" | "--import" => {
                let path = args.next().ok_or_else(|| anyhow!("--import requires a path"))?;
                command = Command::Import(expand_home(&path));
            }
            "-e" | "--export" => {
                let dir = args
                    .next()
                    .ok_or_else(|| anyhow!("--export requires a directory"))?;
                command = Command::Export(expand_home(&dir));
            }
            "-l" | "--list" => {
                command = Command::List(args.next_if(|a| !a.starts_with('-')));
            }
            other => {
                print_usage(&bin_name);
                return Err(anyhow!("Unknown argument: {other}"));
            }
        }
    }

    let cfg = load_config()?;
    let vault_dir = cfg.vault_dir()?;
    let storage = FileStore::open(&vault_dir)?;
    init_logging(&vault_dir, &cfg.log_level)?;
    info!(vault_dir = %vault_dir.display(), "securevault starting");

    match command {
        Command::Tui => run_tui(storage, &cfg, &vault_dir),
        Command::Import(path) => import_headless(storage, path),
        Command::Export(dir) => {
            let store = unlock_headless(storage)?;
            let path = write_export(&store, &dir, Utc::now())?;
            println!("Backup written to {}", path.display());
            Ok(())
        }
        Command::List(query) => list_headless(storage, query),
    }
}

fn unlock_headless(storage: FileStore) -> Result<VaultStore<SealedStore<FileStore>>> {
    let mut gate = LockGate::new(storage.clone());
    let key = match gate.status()? {
        GateStatus::Setup => {
            println!("No master password yet. Create one ({MIN_PASSWORD_LEN}+ characters).");
            loop {
                let first = prompt_secret("New master password: ")?;
                let second = prompt_secret("Confirm master password: ")?;
                match gate.setup(&first, &second) {
                    Ok(key) => break key,
                    Err(e @ (GateError::TooShort(_) | GateError::Mismatch)) => {
                        eprintln!("{e}. Try again.");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        GateStatus::Locked => {
            let password = prompt_secret("Master password: ")?;
            gate.unlock(&password)?
        }
    };
    Ok(VaultStore::open(
        SealedStore::new(storage, key),
        RandomIds,
        SystemClock,
    )?)
}

fn import_headless(storage: FileStore, path: PathBuf) -> Result<()> {
    let mut store = unlock_headless(storage)?;
    let mut filter = ViewFilter::default();
    let mut view = ActiveView::Vault;
    let mut print_event = |event: &ImportEvent| {
        let marker = if event.is_error { '!' } else { '*' };
        println!("{marker} [{}/{FINAL_STAGE}] {}", event.stage, event.message);
    };
    let summary = run_import(
        &mut store,
        &mut filter,
        &mut view,
        ImportSource::File(path),
        &mut print_event,
    )?;
    println!(
        "Imported {} entries ({} new, {} updated), {} folders added. Vault holds {} entries.",
        summary.imported,
        summary.novel,
        summary.updated,
        summary.added_categories,
        summary.total_entries
    );
    Ok(())
}

fn list_headless(storage: FileStore, query: Option<String>) -> Result<()> {
    let store = unlock_headless(storage)?;
    let filter = ViewFilter {
        category: None,
        search: query.unwrap_or_default(),
    };
    let found = filter.apply(store.entries());
    for entry in &found {
        let folder = store
            .category(&entry.category_id)
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        println!("{:<32} {:<12} {folder}", entry.title, entry.kind.label());
    }
    println!("{} of {} entries", found.len(), store.entries().len());
    Ok(())
}

fn run_tui(storage: FileStore, cfg: &Config, vault_dir: &Path) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = (|| -> Result<()> {
        let mut gate = LockGate::new(storage.clone());
        let Some(key) = unlock_screen(&mut terminal, &mut gate)? else {
            return Ok(());
        };
        let store = VaultStore::open(
            SealedStore::new(storage.clone(), key),
            RandomIds,
            SystemClock,
        )?;
        let mut app = App::new(store, AppOptions::from_config(cfg, vault_dir));
        if !gate.seen_tour()? {
            app.open_guide();
            gate.mark_tour_seen()?;
        }
        event_loop(&mut terminal, &mut app)
    })();

    teardown_terminal(&mut terminal);
    result
}

fn unlock_screen(terminal: &mut Term, gate: &mut LockGate<FileStore>) -> Result<Option<DataKey>> {
    let mode = gate.status()?;
    let mut input = Zeroizing::new(String::new());
    let mut first = Zeroizing::new(String::new());
    let mut confirming = false;
    let mut show_input = false;
    let mut status = match mode {
        GateStatus::Setup => format!("New vault: choose a master password ({MIN_PASSWORD_LEN}+ characters). Ctrl+h show/hide"),
        GateStatus::Locked => "Vault locked. Ctrl+h show/hide | Esc quit".to_string(),
    };
    let mut anim_frame: usize = 0;
    let mut last_tick = Instant::now();
    let tick = Duration::from_millis(150);

    loop {
        if last_tick.elapsed() >= tick {
            anim_frame = anim_frame.wrapping_add(1);
            last_tick = Instant::now();
        }
        let input_display = if show_input {
            input.to_string()
        } else {
            "•".repeat(input.chars().count())
        };
        terminal.draw(|f| {
            let view = UnlockState {
                mode,
                confirming,
                status: &status,
                input_display: &input_display,
                input_visible: show_input,
                anim_frame,
            };
            draw_unlock(f, &view);
        })?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        if is_visibility_toggle(&key_event) {
            show_input = !show_input;
            continue;
        }
        match key_event.code {
            KeyCode::Esc => return Ok(None),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Enter => match mode {
                GateStatus::Locked => match gate.unlock(&input) {
                    Ok(key) => return Ok(Some(key)),
                    Err(GateError::WrongPassword) => {
                        status = "Wrong password, access denied".to_string();
                        input.zeroize();
                    }
                    Err(e) => return Err(e.into()),
                },
                GateStatus::Setup if !confirming => {
                    if input.chars().count() < MIN_PASSWORD_LEN {
                        status = GateError::TooShort(MIN_PASSWORD_LEN).to_string();
                        input.zeroize();
                    } else {
                        *first = std::mem::take(&mut *input);
                        confirming = true;
                        status = "Confirm the master password".to_string();
                    }
                }
                GateStatus::Setup => match gate.setup(&first, &input) {
                    Ok(key) => return Ok(Some(key)),
                    Err(e @ (GateError::TooShort(_) | GateError::Mismatch)) => {
                        status = format!("{e}. Start again.");
                        input.zeroize();
                        first.zeroize();
                        confirming = false;
                    }
                    Err(e) => return Err(e.into()),
                },
            },
            _ => {}
        }
    }
}

fn event_loop<S: KeyValueStore>(terminal: &mut Term, app: &mut App<S>) -> Result<()> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| app.render(f))?;
        if app.should_quit() {
            break;
        }
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
    }
    Ok(())
}

fn teardown_terminal(terminal: &mut Term) {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show).ok();
    terminal.show_cursor().ok();
}

fn is_visibility_toggle(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('h') | KeyCode::Char('H'))
        && key.modifiers.contains(KeyModifiers::CONTROL)
}

pub struct AppOptions {
    pub export_dir: PathBuf,
    pub clipboard_clear: Duration,
    pub import_reveal: Duration,
}

impl AppOptions {
    pub fn from_config(cfg: &Config, vault_dir: &Path) -> Self {
        Self {
            export_dir: vault_dir.to_path_buf(),
            clipboard_clear: Duration::from_secs(cfg.clipboard_clear_secs),
            import_reveal: Duration::from_millis(cfg.import_reveal_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Type,
    Folder,
    Username,
    Issuer,
    Value,
    Notes,
}

#[derive(Default)]
struct EntryForm {
    editing: Option<String>,
    step: usize,
    title: String,
    kind: EntryType,
    category_idx: usize,
    username: String,
    issuer: String,
    value: Zeroizing<String>,
    notes: String,
    show_value: bool,
    pad: PatternPad,
    playback: Option<(Playback, Instant)>,
}

impl EntryForm {
    fn from_entry(entry: &VaultEntry, categories: &[Category]) -> Self {
        Self {
            editing: Some(entry.id.clone()),
            title: entry.title.clone(),
            kind: entry.kind,
            category_idx: categories
                .iter()
                .position(|c| c.id == entry.category_id)
                .unwrap_or(0),
            username: entry.username.clone().unwrap_or_default(),
            issuer: entry.issuer.clone().unwrap_or_default(),
            value: Zeroizing::new(entry.value.clone()),
            notes: entry.notes.clone().unwrap_or_default(),
            pad: PatternPad::from_value(&entry.value),
            ..Self::default()
        }
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Title, Field::Type, Field::Folder];
        if self.kind.uses_username() {
            fields.push(Field::Username);
        }
        if self.kind.uses_issuer() {
            fields.push(Field::Issuer);
        }
        fields.push(Field::Value);
        fields.push(Field::Notes);
        fields
    }

    fn field(&self) -> Field {
        let fields = self.fields();
        fields[self.step.min(fields.len() - 1)]
    }

    fn value_text(&self) -> String {
        if self.kind == EntryType::Pattern {
            self.pad.value()
        } else {
            self.value.to_string()
        }
    }

    fn draft(&self, categories: &[Category]) -> EntryDraft {
        let keep_if = |used: bool, text: &str| {
            Some(if used {
                text.trim().to_string()
            } else {
                String::new()
            })
        };
        EntryDraft {
            title: Some(self.title.trim().to_string()),
            kind: Some(self.kind),
            category_id: categories.get(self.category_idx).map(|c| c.id.clone()),
            username: keep_if(self.kind.uses_username(), &self.username),
            issuer: keep_if(self.kind.uses_issuer(), &self.issuer),
            value: Some(self.value_text()),
            notes: Some(self.notes.trim().to_string()),
        }
    }

    fn playback_frame(&self, now: Instant) -> Option<PlaybackFrame> {
        self.playback
            .map(|(timeline, started)| timeline.frame_at(now.saturating_duration_since(started)))
    }
}

#[derive(Default)]
struct FolderForm {
    step: usize,
    name: String,
    color_idx: usize,
}

struct DeleteFolderForm {
    id: String,
    name: String,
    members: usize,
    targets: Vec<(String, String)>,
    target_idx: usize,
}

struct ImportProgress {
    log: ImportLog,
    started: Instant,
    reveal: Duration,
    skipped: bool,
}

impl ImportProgress {
    fn visible(&self, now: Instant) -> usize {
        if self.skipped {
            return self.log.events.len();
        }
        let elapsed = now.saturating_duration_since(self.started).as_millis();
        let step = self.reveal.as_millis().max(1);
        ((elapsed / step) as usize + 1).min(self.log.events.len())
    }

    fn finished(&self, now: Instant) -> bool {
        self.visible(now) == self.log.events.len()
    }
}

struct DetailPlayback {
    entry_id: String,
    pad: PatternPad,
    timeline: Playback,
    started: Instant,
}

#[derive(Default)]
enum Modal {
    #[default]
    None,
    Entry(EntryForm),
    Folder(FolderForm),
    DeleteEntry { id: String, title: String },
    DeleteFolder(DeleteFolderForm),
    ImportPath(String),
    Importing(ImportProgress),
    Guide(usize),
    Quit,
}

pub struct App<S> {
    store: VaultStore<S>,
    options: AppOptions,
    filter: ViewFilter,
    view: ActiveView,
    folder_idx: usize,
    entry_idx: usize,
    portal_idx: usize,
    focus_folders: bool,
    searching: bool,
    reveal: bool,
    modal: Modal,
    playback: Option<DetailPlayback>,
    status: String,
    status_until: Option<Instant>,
    quit: bool,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(store: VaultStore<S>, options: AppOptions) -> Self {
        Self {
            store,
            options,
            filter: ViewFilter::default(),
            view: ActiveView::Vault,
            folder_idx: 0,
            entry_idx: 0,
            portal_idx: 0,
            focus_folders: false,
            searching: false,
            reveal: false,
            modal: Modal::None,
            playback: None,
            status: NAV_HINT.to_string(),
            status_until: None,
            quit: false,
        }
    }

    pub fn store(&self) -> &VaultStore<S> {
        &self.store
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn view(&self) -> ActiveView {
        self.view
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn open_guide(&mut self) {
        self.modal = Modal::Guide(0);
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.status_until = Some(Instant::now() + Duration::from_secs(STATUS_MESSAGE_SECS));
    }

    /// Expires status messages and finished playbacks.
    pub fn tick(&mut self, now: Instant) {
        if self.status_until.is_some_and(|until| now >= until) {
            self.status = NAV_HINT.to_string();
            self.status_until = None;
        }
        if let Some(playback) = &self.playback {
            let elapsed = now.saturating_duration_since(playback.started);
            if playback.timeline.frame_at(elapsed) == PlaybackFrame::Finished {
                self.playback = None;
            }
        }
        if let Modal::Entry(form) = &mut self.modal {
            if form.playback_frame(now) == Some(PlaybackFrame::Finished) {
                form.playback = None;
                form.pad.stop_playback();
            }
        }
    }

    fn visible_entries(&self) -> Vec<&VaultEntry> {
        self.filter.apply(self.store.entries())
    }

    fn selected_entry(&self) -> Option<&VaultEntry> {
        let visible = self.visible_entries();
        visible
            .get(self.entry_idx.min(visible.len().saturating_sub(1)))
            .copied()
    }

    fn folder_count(&self) -> usize {
        self.store.categories().len() + 1
    }

    fn select_folder(&mut self, idx: usize) {
        self.folder_idx = idx.min(self.folder_count() - 1);
        self.filter.category = match self.folder_idx {
            0 => None,
            i => Some(self.store.categories()[i - 1].id.clone()),
        };
        self.view = ActiveView::Vault;
        self.entry_idx = 0;
        self.playback = None;
    }

    /// Re-derives the sidebar cursor after the folder list changed.
    fn sync_folder_idx(&mut self) {
        self.folder_idx = match &self.filter.category {
            Some(id) => match self.store.categories().iter().position(|c| &c.id == id) {
                Some(pos) => pos + 1,
                None => {
                    self.filter.category = None;
                    0
                }
            },
            None => 0,
        };
        let len = self.visible_entries().len();
        self.entry_idx = self.entry_idx.min(len.saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if matches!(self.modal, Modal::None) {
            if let Err(e) = self.handle_main_key(key) {
                error!(error = %e, "action failed");
                self.set_status(format!("Error: {e:#}"));
            }
            return;
        }
        let modal = std::mem::take(&mut self.modal);
        self.modal = match modal {
            Modal::None => Modal::None,
            Modal::Entry(form) => self.entry_form_key(form, key),
            Modal::Folder(form) => self.folder_form_key(form, key),
            Modal::DeleteEntry { id, title } => self.delete_entry_key(id, title, key),
            Modal::DeleteFolder(form) => self.delete_folder_key(form, key),
            Modal::ImportPath(path) => self.import_path_key(path, key),
            Modal::Importing(progress) => self.importing_key(progress, key),
            Modal::Guide(step) => guide_key(step, key),
            Modal::Quit => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.quit = true;
                    Modal::None
                }
                KeyCode::Char('n') | KeyCode::Esc => Modal::None,
                _ => Modal::Quit,
            },
        };
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.searching {
            match key.code {
                KeyCode::Esc => {
                    self.filter.search.clear();
                    self.searching = false;
                }
                KeyCode::Enter | KeyCode::Down => self.searching = false,
                KeyCode::Backspace => {
                    self.filter.search.pop();
                }
                KeyCode::Char(c) => self.filter.search.push(c),
                _ => {}
            }
            self.entry_idx = 0;
            self.playback = None;
            return Ok(());
        }
        if self.view == ActiveView::Portals {
            self.portal_key(key)?;
            return Ok(());
        }

        match key.code {
            KeyCode::Esc => self.modal = Modal::Quit,
            KeyCode::Left => self.focus_folders = true,
            KeyCode::Right => self.focus_folders = false,
            KeyCode::Up => {
                if self.focus_folders {
                    self.select_folder(self.folder_idx.saturating_sub(1));
                } else {
                    self.entry_idx = self.entry_idx.saturating_sub(1);
                    self.playback = None;
                }
            }
            KeyCode::Down => {
                if self.focus_folders {
                    self.select_folder(self.folder_idx + 1);
                } else {
                    let max = self.visible_entries().len().saturating_sub(1);
                    self.entry_idx = (self.entry_idx + 1).min(max);
                    self.playback = None;
                }
            }
            KeyCode::Char('/') => {
                self.searching = true;
                self.focus_folders = false;
            }
            KeyCode::Char('n') => {
                let categories = self.store.categories();
                let category_idx = self
                    .filter
                    .category
                    .as_ref()
                    .and_then(|id| categories.iter().position(|c| &c.id == id))
                    .unwrap_or(0);
                self.modal = Modal::Entry(EntryForm {
                    category_idx,
                    ..EntryForm::default()
                });
            }
            KeyCode::Char('e') => match self.selected_entry() {
                Some(entry) => {
                    let form = EntryForm::from_entry(entry, self.store.categories());
                    self.modal = Modal::Entry(form);
                }
                None => self.set_status("No entry selected"),
            },
            KeyCode::Char('d') => match self.selected_entry() {
                Some(entry) => {
                    self.modal = Modal::DeleteEntry {
                        id: entry.id.clone(),
                        title: entry.title.clone(),
                    };
                }
                None => self.set_status("No entry selected"),
            },
            KeyCode::Char('c') => {
                if let Some(entry) = self.selected_entry() {
                    let (title, value) = (entry.title.clone(), Zeroizing::new(entry.value.clone()));
                    copy_to_clipboard(&value, self.options.clipboard_clear)?;
                    self.set_status(format!(
                        "Copied '{title}' to clipboard for {}s",
                        self.options.clipboard_clear.as_secs()
                    ));
                }
            }
            KeyCode::Char('u') => {
                let username = self.selected_entry().and_then(|e| e.username.clone());
                match username {
                    Some(user) => {
                        copy_to_clipboard(&user, self.options.clipboard_clear)?;
                        self.set_status("Username copied");
                    }
                    None => self.set_status("Entry has no username"),
                }
            }
            KeyCode::Char('v') => {
                self.reveal = !self.reveal;
                self.set_status(if self.reveal { "Values visible" } else { "Values hidden" });
            }
            KeyCode::Char('p') => self.start_detail_playback(),
            KeyCode::Char('f') => self.modal = Modal::Folder(FolderForm::default()),
            KeyCode::Char('x') => self.prepare_folder_delete(),
            KeyCode::Char('i') => self.modal = Modal::ImportPath(String::new()),
            KeyCode::Char('o') => {
                let path = write_export(&self.store, &self.options.export_dir, Utc::now())?;
                self.set_status(format!("Backup written to {}", path.display()));
            }
            KeyCode::Char('w') => {
                self.view = ActiveView::Portals;
                self.filter.category = None;
                self.folder_idx = 0;
                self.playback = None;
            }
            KeyCode::Char('?') => self.open_guide(),
            _ => {}
        }
        Ok(())
    }

    fn portal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('w') => self.view = ActiveView::Vault,
            KeyCode::Up => self.portal_idx = self.portal_idx.saturating_sub(1),
            KeyCode::Down => self.portal_idx = (self.portal_idx + 1).min(PORTALS.len() - 1),
            KeyCode::Enter | KeyCode::Char('c') => {
                let portal = PORTALS[self.portal_idx.min(PORTALS.len() - 1)];
                copy_to_clipboard(portal.url, self.options.clipboard_clear)?;
                self.set_status(format!("Link to {} copied", portal.title));
            }
            _ => {}
        }
        Ok(())
    }

    fn start_detail_playback(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if entry.kind != EntryType::Pattern {
            self.set_status("Playback is only for pattern entries");
            return;
        }
        let entry_id = entry.id.clone();
        let mut pad = PatternPad::from_value(&entry.value);
        match pad.start_playback() {
            Some(timeline) => {
                self.playback = Some(DetailPlayback {
                    entry_id,
                    pad,
                    timeline,
                    started: Instant::now(),
                });
            }
            None => self.set_status("Playback needs at least two points"),
        }
    }

    fn prepare_folder_delete(&mut self) {
        if self.folder_idx == 0 {
            self.set_status("Select a folder in the sidebar first");
            return;
        }
        let categories = self.store.categories();
        let Some(category) = categories.get(self.folder_idx - 1) else {
            return;
        };
        if category.id == UNCATEGORIZED_ID {
            self.set_status(format!("'{}' cannot be deleted", category.name));
            return;
        }
        let targets = categories
            .iter()
            .filter(|c| c.id != category.id)
            .map(|c| (c.id.clone(), c.name.clone()))
            .collect();
        self.modal = Modal::DeleteFolder(DeleteFolderForm {
            id: category.id.clone(),
            name: category.name.clone(),
            members: self.store.count_in_category(&category.id),
            targets,
            target_idx: 0,
        });
    }

    fn entry_form_key(&mut self, mut form: EntryForm, key: KeyEvent) -> Modal {
        if is_visibility_toggle(&key) {
            form.show_value = !form.show_value;
            return Modal::Entry(form);
        }
        let last = form.fields().len() - 1;
        let field = form.field();
        match key.code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled");
                return Modal::None;
            }
            KeyCode::Up | KeyCode::BackTab => form.step = form.step.saturating_sub(1),
            KeyCode::Down => form.step = (form.step + 1).min(last),
            KeyCode::Enter if form.step < last => form.step += 1,
            KeyCode::Enter => return self.save_entry(form),
            KeyCode::Left | KeyCode::Right => {
                let forward = key.code == KeyCode::Right;
                match field {
                    Field::Type => {
                        form.kind = if forward { form.kind.next() } else { form.kind.prev() };
                        form.step = form.step.min(form.fields().len() - 1);
                    }
                    Field::Folder => {
                        let len = self.store.categories().len();
                        form.category_idx = if forward {
                            (form.category_idx + 1) % len
                        } else {
                            (form.category_idx + len - 1) % len
                        };
                    }
                    _ => {}
                }
            }
            KeyCode::Tab if field == Field::Value => match form.kind {
                EntryType::Password => {
                    *form.value = generate_strong_password(GENERATED_PASSWORD_LEN);
                    self.set_status("Generated strong password");
                }
                EntryType::Pattern => match form.pad.start_playback() {
                    Some(timeline) => form.playback = Some((timeline, Instant::now())),
                    None => self.set_status("Playback needs at least two points"),
                },
                _ => {}
            },
            KeyCode::Backspace => match field {
                Field::Title => {
                    form.title.pop();
                }
                Field::Username => {
                    form.username.pop();
                }
                Field::Issuer => {
                    form.issuer.pop();
                }
                Field::Value if form.kind == EntryType::Pattern => form.pad.reset(),
                Field::Value => {
                    form.value.pop();
                }
                Field::Notes => {
                    form.notes.pop();
                }
                Field::Type | Field::Folder => {}
            },
            KeyCode::Char(c) => match field {
                Field::Title => form.title.push(c),
                Field::Username => form.username.push(c),
                Field::Issuer => form.issuer.push(c),
                Field::Value if form.kind == EntryType::Pattern => {
                    if let Some(cell) = c.to_digit(10).filter(|d| (1..=9).contains(d)) {
                        if !form.pad.tap(cell as u8 - 1) && form.pad.is_playing() {
                            self.set_status("Wait for the playback to finish");
                        }
                    }
                }
                Field::Value => form.value.push(c),
                Field::Notes => form.notes.push(c),
                Field::Type | Field::Folder => {}
            },
            _ => {}
        }
        Modal::Entry(form)
    }

    fn save_entry(&mut self, form: EntryForm) -> Modal {
        let draft = form.draft(self.store.categories());
        if let Err(e) = validate_draft(&draft) {
            self.set_status(e.to_string());
            return Modal::Entry(form);
        }
        let result: Result<String, StoreError> = match &form.editing {
            Some(id) => self
                .store
                .update_entry(id, draft)
                .map(|updated| updated.map(|e| e.id).unwrap_or_else(|| id.clone())),
            None => self.store.create_entry(draft).map(|e| e.id),
        };
        match result {
            Ok(id) => {
                let visible = self.visible_entries();
                self.entry_idx = visible.iter().position(|e| e.id == id).unwrap_or(0);
                self.set_status(if form.editing.is_some() {
                    "Entry updated"
                } else {
                    "Entry saved"
                });
                Modal::None
            }
            Err(e) => {
                error!(error = %e, "saving entry failed");
                self.set_status(format!("Save failed: {e}"));
                Modal::Entry(form)
            }
        }
    }

    fn folder_form_key(&mut self, mut form: FolderForm, key: KeyEvent) -> Modal {
        match key.code {
            KeyCode::Esc => return Modal::None,
            KeyCode::Up | KeyCode::BackTab => form.step = 0,
            KeyCode::Down | KeyCode::Tab => form.step = 1,
            KeyCode::Left if form.step == 1 => {
                form.color_idx = (form.color_idx + CATEGORY_PALETTE.len() - 1) % CATEGORY_PALETTE.len();
            }
            KeyCode::Right if form.step == 1 => {
                form.color_idx = (form.color_idx + 1) % CATEGORY_PALETTE.len();
            }
            KeyCode::Enter if form.step == 0 => form.step = 1,
            KeyCode::Enter => {
                return match self
                    .store
                    .create_category(&form.name, CATEGORY_PALETTE[form.color_idx])
                {
                    Ok(category) => {
                        self.set_status(format!("Folder '{}' created", category.name));
                        Modal::None
                    }
                    Err(e) => {
                        self.set_status(e.to_string());
                        form.step = 0;
                        Modal::Folder(form)
                    }
                };
            }
            KeyCode::Backspace if form.step == 0 => {
                form.name.pop();
            }
            KeyCode::Char(c) if form.step == 0 => form.name.push(c),
            _ => {}
        }
        Modal::Folder(form)
    }

    fn delete_entry_key(&mut self, id: String, title: String, key: KeyEvent) -> Modal {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.store.delete_entry(&id) {
                    Ok(_) => {
                        let len = self.visible_entries().len();
                        self.entry_idx = self.entry_idx.min(len.saturating_sub(1));
                        self.playback = None;
                        self.set_status(format!("'{title}' deleted"));
                    }
                    Err(e) => self.set_status(format!("Delete failed: {e}")),
                }
                Modal::None
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.set_status("Delete cancelled");
                Modal::None
            }
            _ => Modal::DeleteEntry { id, title },
        }
    }

    fn delete_folder_key(&mut self, mut form: DeleteFolderForm, key: KeyEvent) -> Modal {
        let len = form.targets.len().max(1);
        match key.code {
            KeyCode::Left => form.target_idx = (form.target_idx + len - 1) % len,
            KeyCode::Right => form.target_idx = (form.target_idx + 1) % len,
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                let target = form.targets.get(form.target_idx).map(|(id, _)| id.as_str());
                match self.store.delete_category(&form.id, target) {
                    Ok(moved) => {
                        self.filter.forget_category(&form.id);
                        self.sync_folder_idx();
                        self.set_status(format!("Folder '{}' deleted, {moved} entries moved", form.name));
                    }
                    Err(e) => self.set_status(format!("Delete failed: {e}")),
                }
                return Modal::None;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.set_status("Delete cancelled");
                return Modal::None;
            }
            _ => {}
        }
        Modal::DeleteFolder(form)
    }

    fn import_path_key(&mut self, mut path: String, key: KeyEvent) -> Modal {
        match key.code {
            KeyCode::Esc => return Modal::None,
            KeyCode::Backspace => {
                path.pop();
            }
            KeyCode::Char(c) => path.push(c),
            KeyCode::Enter if !path.trim().is_empty() => return self.start_import(&path),
            _ => {}
        }
        Modal::ImportPath(path)
    }

    fn start_import(&mut self, raw_path: &str) -> Modal {
        let mut log = ImportLog::default();
        let outcome = run_import(
            &mut self.store,
            &mut self.filter,
            &mut self.view,
            ImportSource::File(expand_home(raw_path.trim())),
            &mut log,
        );
        match outcome {
            Ok(summary) => {
                self.searching = false;
                self.folder_idx = 0;
                self.entry_idx = 0;
                self.playback = None;
                self.set_status(format!(
                    "Imported {} entries ({} new)",
                    summary.imported, summary.novel
                ));
            }
            Err(e) => warn!(error = %e, "import from UI failed"),
        }
        Modal::Importing(ImportProgress {
            log,
            started: Instant::now(),
            reveal: self.options.import_reveal,
            skipped: false,
        })
    }

    fn importing_key(&mut self, mut progress: ImportProgress, key: KeyEvent) -> Modal {
        let now = Instant::now();
        match key.code {
            KeyCode::Enter | KeyCode::Esc if progress.finished(now) => Modal::None,
            KeyCode::Enter => {
                progress.skipped = true;
                Modal::Importing(progress)
            }
            _ => Modal::Importing(progress),
        }
    }

    fn detail_pattern(&self, entry: &VaultEntry, now: Instant) -> Option<PatternView> {
        if entry.kind != EntryType::Pattern {
            return None;
        }
        if let Some(playback) = self.playback.as_ref().filter(|p| p.entry_id == entry.id) {
            let frame = playback
                .timeline
                .frame_at(now.saturating_duration_since(playback.started));
            let points = playback.pad.points().to_vec();
            let shown = playback.pad.visible_path(Some(frame)).len();
            let cursor = frame.cursor().and_then(|c| usize::try_from(c).ok());
            return Some(PatternView {
                points,
                shown,
                cursor,
            });
        }
        self.reveal.then(|| {
            let pad = PatternPad::from_value(&entry.value);
            PatternView {
                shown: pad.points().len(),
                points: pad.points().to_vec(),
                cursor: None,
            }
        })
    }

    fn overlay(&self, now: Instant) -> (Option<Vec<String>>, Option<String>) {
        match &self.modal {
            Modal::None | Modal::Importing(_) => (None, None),
            Modal::Entry(form) => {
                let title = if form.editing.is_some() {
                    "Edit entry"
                } else {
                    "New entry"
                };
                (
                    Some(build_entry_overlay(form, self.store.categories(), now)),
                    Some(title.to_string()),
                )
            }
            Modal::Folder(form) => (Some(build_folder_overlay(form)), Some("New folder".into())),
            Modal::DeleteEntry { title, .. } => (
                Some(vec![
                    format!("Delete '{title}'?"),
                    "This cannot be undone.".to_string(),
                    String::new(),
                    "[y] Yes   [n] No".to_string(),
                ]),
                Some("Delete entry".into()),
            ),
            Modal::DeleteFolder(form) => (
                Some(build_delete_folder_overlay(form)),
                Some("Delete folder".into()),
            ),
            Modal::ImportPath(path) => (
                Some(vec![
                    "Path to a SecureVault backup (.json)".to_string(),
                    String::new(),
                    format!("> {path}"),
                    String::new(),
                    "Enter import | Esc cancel".to_string(),
                ]),
                Some("Import".into()),
            ),
            Modal::Guide(step) => (Some(guide_lines(*step)), Some("Guide".into())),
            Modal::Quit => (
                Some(vec![
                    "Quit SecureVault?".to_string(),
                    String::new(),
                    "[y] Yes   [n] No".to_string(),
                ]),
                Some("Confirm quit".into()),
            ),
        }
    }

    pub fn render(&self, f: &mut Frame<'_>) {
        let now = Instant::now();
        let categories = self.store.categories();
        let mut folders = vec![FolderRow {
            name: "All",
            color: DEFAULT_COLOR,
            count: self.store.entries().len(),
        }];
        folders.extend(categories.iter().map(|c| FolderRow {
            name: &c.name,
            color: &c.color,
            count: self.store.count_in_category(&c.id),
        }));
        let entries = self.visible_entries();
        let detail_pattern = entries
            .get(self.entry_idx.min(entries.len().saturating_sub(1)))
            .and_then(|e| self.detail_pattern(e, now));
        let (overlay, overlay_title) = self.overlay(now);
        let import = match &self.modal {
            Modal::Importing(progress) => Some(ImportView {
                events: &progress.log.events[..progress.visible(now)],
                finished: progress.finished(now),
            }),
            _ => None,
        };
        let state = ViewState {
            folders,
            folder_idx: self.folder_idx,
            categories,
            entries,
            entry_idx: self.entry_idx,
            focus_folders: self.focus_folders,
            view: self.view,
            portal_idx: self.portal_idx,
            search: &self.filter.search,
            searching: self.searching,
            reveal: self.reveal,
            detail_pattern,
            stats: self.store.stats(),
            clock: chrono::Local::now().format("%H:%M:%S").to_string(),
            overlay,
            overlay_title,
            import,
            status: &self.status,
        };
        draw(f, &state);
    }
}

fn guide_key(step: usize, key: KeyEvent) -> Modal {
    let last = GUIDE_STEPS.len() - 1;
    match key.code {
        KeyCode::Esc => Modal::None,
        KeyCode::Left => Modal::Guide(step.saturating_sub(1)),
        KeyCode::Right | KeyCode::Enter if step < last => Modal::Guide(step + 1),
        KeyCode::Enter => Modal::None,
        _ => Modal::Guide(step),
    }
}

fn build_entry_overlay(form: &EntryForm, categories: &[Category], now: Instant) -> Vec<String> {
    let current = form.field();
    let mut lines = Vec::new();
    for field in form.fields() {
        let marker = if field == current { ">" } else { " " };
        match field {
            Field::Title => lines.push(format!("{marker} Title: {}", form.title)),
            Field::Type => lines.push(format!("{marker} Type: ◀ {} ▶", form.kind)),
            Field::Folder => {
                let name = categories
                    .get(form.category_idx)
                    .map(|c| c.name.as_str())
                    .unwrap_or("-");
                lines.push(format!("{marker} Folder: ◀ {name} ▶"));
            }
            Field::Username => lines.push(format!("{marker} Username: {}", form.username)),
            Field::Issuer => lines.push(format!("{marker} Issuer: {}", form.issuer)),
            Field::Value if form.kind == EntryType::Pattern => {
                let frame = form.playback_frame(now);
                let points = form.pad.points();
                let shown = form.pad.visible_path(frame).len();
                let cursor = frame
                    .and_then(PlaybackFrame::cursor)
                    .and_then(|c| usize::try_from(c).ok());
                lines.push(format!("{marker} Pattern: {} points", points.len()));
                lines.extend(pattern_grid(points, shown, cursor).into_iter().map(|row| format!("     {row}")));
            }
            Field::Value => {
                let shown = if form.show_value {
                    form.value.to_string()
                } else {
                    "*".repeat(form.value.chars().count())
                };
                lines.push(format!("{marker} {}: {shown}", value_label(form.kind)));
            }
            Field::Notes => lines.push(format!("{marker} Notes: {}", form.notes)),
        }
    }
    lines.push(String::new());
    lines.push(match (current, form.kind) {
        (Field::Type | Field::Folder, _) => "←/→ change | ↑/↓ move | Enter next | Esc cancel".to_string(),
        (Field::Value, EntryType::Pattern) => {
            "1-9 tap cells | Backspace clear | Tab play back | Enter next".to_string()
        }
        (Field::Value, EntryType::Password) => {
            "Tab generates a password | Ctrl+h show/hide | Enter next".to_string()
        }
        (Field::Notes, _) => "Enter saves | ↑/↓ move | Esc cancel".to_string(),
        _ => "Enter next | ↑/↓ move | Esc cancel".to_string(),
    });
    lines
}

fn value_label(kind: EntryType) -> &'static str {
    match kind {
        EntryType::Password => "Password",
        EntryType::Pin => "PIN",
        EntryType::Pattern => "Pattern",
        EntryType::SeedPhrase => "Seed phrase",
        EntryType::SecretKey => "Secret key",
    }
}

fn build_folder_overlay(form: &FolderForm) -> Vec<String> {
    let marker = |step: usize| if form.step == step { ">" } else { " " };
    vec![
        format!("{} Name: {}", marker(0), form.name),
        format!(
            "{} Color: ◀ {} ▶  ({}/{})",
            marker(1),
            CATEGORY_PALETTE[form.color_idx],
            form.color_idx + 1,
            CATEGORY_PALETTE.len()
        ),
        String::new(),
        "↑/↓ move | ←/→ color | Enter create | Esc cancel".to_string(),
    ]
}

fn build_delete_folder_overlay(form: &DeleteFolderForm) -> Vec<String> {
    let mut lines = vec![format!("Delete folder '{}'?", form.name), String::new()];
    if form.members > 0 {
        let target = form
            .targets
            .get(form.target_idx)
            .map(|(_, name)| name.as_str())
            .unwrap_or("-");
        lines.push(format!("{} entries will move to: ◀ {target} ▶", form.members));
        lines.push(String::new());
    }
    lines.push("[y] Delete   [n] Cancel".to_string());
    lines
}

fn generate_strong_password(len: usize) -> String {
    let target_len = len.max(12);
    let upper = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    let lower = b"abcdefghijkmnopqrstuvwxyz";
    let digits = b"23456789";
    let special = b"!@#$%^&*()-_=+[]{};:,.?";

    let mut rng = OsRng;
    let mut pick = |set: &[u8]| set[rng.gen_range(0..set.len())] as char;
    let mut chars = vec![pick(upper), pick(lower), pick(digits), pick(special)];
    let all: Vec<u8> = [&upper[..], &lower[..], &digits[..], &special[..]].concat();
    while chars.len() < target_len {
        chars.push(pick(&all));
    }
    chars.shuffle(&mut OsRng);
    chars.into_iter().collect()
}

fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} [OPTIONS]");
    eprintln!("  (no options)            Open the vault UI");
    eprintln!("  -i, --import <PATH>     Merge a JSON backup into the vault");
    eprintln!("  -e, --export <DIR>      Write a JSON backup into DIR");
    eprintln!("  -l, --list [QUERY]      List entries whose title contains QUERY");
    eprintln!("  -g, --generate          Generate and print a strong password");
    eprintln!("  -V, --version           Show version and exit");
}

fn executable_name() -> String {
    let fallback = "securevault".to_string();
    let arg0 = match std::env::args().next() {
        Some(v) => v,
        None => return fallback,
    };
    let path = Path::new(&arg0);
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => fallback,
    }
}
