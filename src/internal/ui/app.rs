use anyhow::Result;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::api::{FetchOptions, StorySource};
use crate::config::{AppConfig, PanelStyle, SessionConfig};
use crate::internal::clock::Clock;
use crate::internal::models::{FetchState, Story};
use crate::internal::notification::Notification;
use crate::internal::removals::RemovalStore;
use crate::internal::tab::Tab;
use crate::internal::ui::keybindings::{KeyBindingContext, KeyBindingMap};
use crate::internal::ui::keybindings_default::create_default_keybindings;
use crate::utils::theme_loader::{TuiTheme, load_or_default};
use crate::utils::url::is_openable;

/// The exclusive interaction state. Exactly one is active; it decides which
/// binding table a keystroke is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigation,
    SearchEntry,
    Modal,
    Drawer,
    Help,
}

/// User-facing commands that keys can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Quit,
    MoveUp,
    MoveDown,
    /// On a character key this is a chord: the key must be pressed twice.
    JumpToTop,
    JumpToBottom,
    OpenPanel,
    OpenComments,
    OpenArticle,
    RemoveStory,
    StartSearch,
    ToggleSort,
    ToggleDateOrder,
    Refresh,
    NextTab,
    PrevTab,
    /// 1-based tab number.
    SelectTab(usize),
    ToggleHelp,
    Back,
    Confirm,
}

/// Options offered by the modal/drawer, in cursor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOption {
    OpenDiscussion,
    OpenArticle,
    Remove,
}

impl PanelOption {
    pub const ALL: [PanelOption; 3] = [
        PanelOption::OpenDiscussion,
        PanelOption::OpenArticle,
        PanelOption::Remove,
    ];

    pub fn label(self, story: &Story) -> &'static str {
        match self {
            PanelOption::OpenDiscussion => "Open discussion",
            PanelOption::OpenArticle if story.url.is_none() => "No external URL available",
            PanelOption::OpenArticle => "Open article",
            PanelOption::Remove => "Remove from list",
        }
    }
}

/// The story a panel was opened for, and its option cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub story: Story,
    pub cursor: usize,
}

impl PanelState {
    pub fn new(story: Story) -> Self {
        Self { story, cursor: 0 }
    }

    /// Moves the cursor, clamped to the option list (no wrap).
    pub fn move_cursor(&mut self, delta: isize) {
        let last = PanelOption::ALL.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
    }

    pub fn option(&self) -> PanelOption {
        PanelOption::ALL[self.cursor.min(PanelOption::ALL.len() - 1)]
    }
}

/// A fetch the runtime should perform off the input path.
pub struct FetchRequest {
    pub tab: usize,
    pub source: Arc<dyn StorySource>,
    pub removed: HashSet<String>,
    pub options: FetchOptions,
}

impl FetchRequest {
    pub async fn run(self) -> AppEvent {
        let result = self
            .source
            .fetch_stories(&self.removed, self.options)
            .await
            .map_err(|e| format!("{e:#}"));
        AppEvent::FetchCompleted {
            tab: self.tab,
            result,
        }
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("tab", &self.tab)
            .field("removed", &self.removed.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Side effects requested by the reducer; executed by [`App::run`].
#[derive(Debug)]
pub enum Command {
    Fetch(FetchRequest),
    OpenUrl(String),
    Quit,
}

/// Results posted back onto the state-update path.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    FetchCompleted {
        tab: usize,
        result: Result<Vec<Story>, String>,
    },
    LinkOpenFailed {
        url: String,
        error: String,
    },
}

#[derive(Debug, Clone, Copy)]
enum LinkKind {
    Discussion,
    Article,
}

/// The session controller: owns every tab and all UI state.
///
/// Keystrokes go through [`App::handle_key`], fetch completions through
/// [`App::apply_event`]; both run on the same task, one at a time.
pub struct App {
    pub tabs: Vec<Tab>,
    pub active_tab: usize,
    pub mode: Mode,
    pub panel: Option<PanelState>,
    pub notification: Option<Notification>,
    pub theme: TuiTheme,
    pub keybindings: KeyBindingMap,
    pub spinner_state: usize,
    pub running: bool,
    session: SessionConfig,
    chord_deadline: Option<Instant>,
    store: Arc<dyn RemovalStore>,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn new(
        config: &AppConfig,
        sources: Vec<Arc<dyn StorySource>>,
        store: Arc<dyn RemovalStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut keybindings = create_default_keybindings();
        keybindings.merge_config(&config.keybindings);

        Self {
            tabs: sources.into_iter().map(Tab::new).collect(),
            active_tab: 0,
            mode: Mode::Navigation,
            panel: None,
            notification: None,
            theme: load_or_default(config.theme_file.as_deref(), &config.theme_mode),
            keybindings,
            spinner_state: 0,
            running: true,
            session: config.session.clone(),
            chord_deadline: None,
            store,
            clock,
        }
    }

    pub fn page_size(&self) -> usize {
        self.session.page_size.max(1)
    }

    pub fn active(&self) -> Option<&Tab> {
        self.tabs.get(self.active_tab)
    }

    pub fn unix_now(&self) -> i64 {
        self.clock.unix_now()
    }

    pub fn chord_pending(&self) -> bool {
        self.chord_deadline.is_some()
    }

    /// Kicks off the first fetch for the active tab.
    pub fn start(&mut self) -> Option<Command> {
        self.request_fetch(self.active_tab, false)
    }

    /// Marks tab `index` as loading and returns the fetch to run, unless one
    /// is already in flight for it.
    pub fn request_fetch(&mut self, index: usize, force_refresh: bool) -> Option<Command> {
        let tab = self.tabs.get_mut(index)?;
        let removed = self.store.load(&tab.id);
        if !tab.begin_fetch(removed.clone()) {
            tracing::debug!(tab = %tab.id, "Fetch already in flight");
            return None;
        }

        tracing::info!(tab = %tab.id, force_refresh, "Fetching stories");
        Some(Command::Fetch(FetchRequest {
            tab: index,
            source: tab.source.clone(),
            removed,
            options: FetchOptions { force_refresh },
        }))
    }

    /// Advances timers: expires the pending chord and stale notifications.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if self.chord_deadline.is_some_and(|deadline| now >= deadline) {
            self.chord_deadline = None;
        }
        if self
            .notification
            .as_ref()
            .is_some_and(|n| n.should_dismiss(now))
        {
            self.notification = None;
        }
        if self.tabs.iter().any(Tab::loading) {
            self.spinner_state = self.spinner_state.wrapping_add(1);
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        let page = self.page_size();
        match event {
            AppEvent::FetchCompleted { tab, result } => {
                let Some(target) = self.tabs.get_mut(tab) else {
                    return;
                };
                match &result {
                    Ok(stories) => {
                        tracing::info!(tab = %target.id, count = stories.len(), "Fetch completed")
                    }
                    Err(message) => tracing::error!(tab = %target.id, "Fetch failed: {message}"),
                }
                target.finish_fetch(result, page);
            }
            AppEvent::LinkOpenFailed { url, error } => {
                tracing::warn!(%url, "Failed to open link: {error}");
                self.notify_error(format!("Failed to open link: {url}"));
            }
        }
    }

    /// Routes one keystroke to the active mode.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        // Any key consumes a pending chord; only a repeat within the deadline completes it.
        let now = self.clock.now();
        let chord_armed = self
            .chord_deadline
            .take()
            .is_some_and(|deadline| now < deadline);

        if self.keybindings.get_action(&key, KeyBindingContext::Global) == Some(Action::Quit) {
            return self.quit();
        }

        match self.mode {
            Mode::SearchEntry => self.handle_search_key(key),
            Mode::Help => {
                let action = self.keybindings.get_action(&key, KeyBindingContext::Help)?;
                self.handle_help_action(action)
            }
            Mode::Modal | Mode::Drawer => {
                let action = self.keybindings.get_action(&key, KeyBindingContext::Panel)?;
                self.handle_panel_action(action)
            }
            Mode::Navigation => {
                let action = self
                    .keybindings
                    .get_action(&key, KeyBindingContext::Navigation)?;
                self.handle_navigation_action(action, key, chord_armed, now)
            }
        }
    }

    fn quit(&mut self) -> Option<Command> {
        tracing::info!("Quit requested");
        self.running = false;
        Some(Command::Quit)
    }

    fn handle_navigation_action(
        &mut self,
        action: Action,
        key: KeyEvent,
        chord_armed: bool,
        now: Instant,
    ) -> Option<Command> {
        let page = self.page_size();
        match action {
            Action::Quit => return self.quit(),
            Action::ToggleHelp => {
                self.mode = Mode::Help;
                return None;
            }
            Action::NextTab => return self.cycle_tab(1),
            Action::PrevTab => return self.cycle_tab(-1),
            Action::SelectTab(n) => return self.switch_tab(n.checked_sub(1)?),
            Action::Refresh => return self.refresh_active(),
            _ => {}
        }

        let chord_timeout = Duration::from_millis(self.session.chord_timeout_ms);
        let tab = self.tabs.get_mut(self.active_tab)?;
        match action {
            Action::MoveDown => tab.move_selection(1, page),
            Action::MoveUp => tab.move_selection(-1, page),
            Action::JumpToTop => {
                let needs_chord = matches!(key.code, KeyCode::Char(_));
                if chord_armed || !needs_chord {
                    tab.jump_to_top(page);
                } else {
                    self.chord_deadline = Some(now + chord_timeout);
                }
            }
            Action::JumpToBottom => tab.jump_to_bottom(page),
            Action::ToggleSort => tab.toggle_sort(),
            Action::ToggleDateOrder => tab.toggle_date_order(),
            Action::StartSearch => {
                tab.begin_search();
                self.mode = Mode::SearchEntry;
            }
            Action::OpenPanel => {
                let story = tab.selected_story()?.clone();
                self.open_panel(story);
            }
            Action::OpenComments => {
                let story = tab.selected_story()?.clone();
                return self.open_link(&story, LinkKind::Discussion);
            }
            Action::OpenArticle => {
                let story = tab.selected_story()?.clone();
                return self.open_link(&story, LinkKind::Article);
            }
            Action::RemoveStory => {
                let id = tab.selected_story()?.id.clone();
                self.remove(&id);
            }
            _ => {}
        }
        None
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Command> {
        let tab = self.tabs.get_mut(self.active_tab)?;
        match key.code {
            KeyCode::Esc => {
                tab.cancel_search();
                self.mode = Mode::Navigation;
            }
            KeyCode::Enter => {
                tab.confirm_search();
                self.mode = Mode::Navigation;
            }
            KeyCode::Backspace | KeyCode::Delete => tab.pop_search_char(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                tab.push_search_char(c)
            }
            _ => {}
        }
        None
    }

    fn handle_panel_action(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::Quit => self.quit(),
            Action::Back => {
                self.close_panel();
                None
            }
            Action::MoveDown | Action::MoveUp => {
                let delta = if action == Action::MoveDown { 1 } else { -1 };
                if let Some(panel) = self.panel.as_mut() {
                    panel.move_cursor(delta);
                }
                None
            }
            Action::Confirm => {
                let option = self.panel.as_ref()?.option();
                self.run_panel_option(option)
            }
            Action::OpenComments => self.run_panel_option(PanelOption::OpenDiscussion),
            Action::OpenArticle => self.run_panel_option(PanelOption::OpenArticle),
            Action::RemoveStory => self.run_panel_option(PanelOption::Remove),
            _ => None,
        }
    }

    fn handle_help_action(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::Quit => self.quit(),
            Action::Back | Action::ToggleHelp => {
                self.mode = Mode::Navigation;
                None
            }
            _ => None,
        }
    }

    fn open_panel(&mut self, story: Story) {
        self.panel = Some(PanelState::new(story));
        self.mode = match self.session.panel_style {
            PanelStyle::Drawer => Mode::Drawer,
            PanelStyle::Modal => Mode::Modal,
        };
    }

    fn close_panel(&mut self) {
        self.panel = None;
        self.mode = Mode::Navigation;
    }

    fn run_panel_option(&mut self, option: PanelOption) -> Option<Command> {
        let panel = self.panel.take()?;
        self.mode = Mode::Navigation;
        match option {
            PanelOption::OpenDiscussion => self.open_link(&panel.story, LinkKind::Discussion),
            PanelOption::OpenArticle => self.open_link(&panel.story, LinkKind::Article),
            PanelOption::Remove => {
                self.remove(&panel.story.id);
                None
            }
        }
    }

    fn open_link(&mut self, story: &Story, kind: LinkKind) -> Option<Command> {
        let url = match kind {
            LinkKind::Discussion => story.comments_url.clone().or_else(|| story.url.clone()),
            LinkKind::Article => story.url.clone(),
        };
        match url {
            Some(url) if is_openable(&url) => Some(Command::OpenUrl(url)),
            Some(url) => {
                tracing::warn!(%url, "Refusing to open non-web link");
                self.notify_error(format!("Failed to open link: {url}"));
                None
            }
            None => {
                let message = match kind {
                    LinkKind::Discussion => "No discussion link available",
                    LinkKind::Article => "No external URL available",
                };
                self.notify_info(message);
                None
            }
        }
    }

    fn remove(&mut self, story_id: &str) {
        let page = self.page_size();
        let store = self.store.clone();
        let Some(tab) = self.tabs.get_mut(self.active_tab) else {
            return;
        };
        if let Some(removal) = tab.remove_story(story_id, store.as_ref(), page) {
            if removal.search_cleared {
                self.mode = Mode::Navigation;
            }
            self.notify_info(format!("Removed: {}", removal.story.title));
        }
    }

    fn refresh_active(&mut self) -> Option<Command> {
        let page = self.page_size();
        let tab = self.tabs.get_mut(self.active_tab)?;
        if tab.loading() {
            return None;
        }
        tab.jump_to_top(page);
        self.request_fetch(self.active_tab, true)
    }

    fn switch_tab(&mut self, index: usize) -> Option<Command> {
        if index >= self.tabs.len() || index == self.active_tab {
            return None;
        }
        self.active_tab = index;
        let tab = &self.tabs[index];
        tracing::debug!(tab = %tab.id, "Switched tab");
        let state = tab.fetch_state;
        match state {
            FetchState::Idle => self.request_fetch(index, false),
            _ => None,
        }
    }

    fn cycle_tab(&mut self, delta: isize) -> Option<Command> {
        let len = self.tabs.len() as isize;
        if len == 0 {
            return None;
        }
        let next = (self.active_tab as isize + delta).rem_euclid(len) as usize;
        self.switch_tab(next)
    }

    pub fn notify_info(&mut self, message: impl Into<String>) {
        let ttl = Duration::from_millis(self.session.notification_ms);
        self.notification = Some(Notification::info(message, self.clock.now(), ttl));
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        let ttl = Duration::from_millis(self.session.notification_ms);
        self.notification = Some(Notification::error(message, self.clock.now(), ttl));
    }

    fn execute(&mut self, command: Command, tx: &UnboundedSender<AppEvent>) {
        match command {
            Command::Fetch(request) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let event = request.run().await;
                    if tx.send(event).is_err() {
                        tracing::debug!("Event channel closed before fetch completed");
                    }
                });
            }
            Command::OpenUrl(url) => {
                tracing::info!(%url, "Opening link");
                if let Err(e) = open::that(&url) {
                    self.apply_event(AppEvent::LinkOpenFailed {
                        url,
                        error: e.to_string(),
                    });
                }
            }
            Command::Quit => self.running = false,
        }
    }

    pub async fn run(&mut self, mut tui: crate::tui::Tui) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

        if let Some(command) = self.start() {
            self.execute(command, &tx);
        }

        let mut event_interval = tokio::time::interval(Duration::from_millis(16));

        while self.running {
            self.tick();
            tui.draw(|f| super::view::draw(self, f))?;

            tokio::select! {
                _ = event_interval.tick() => {
                    // Check for terminal events
                    if event::poll(Duration::from_millis(0))?
                        && let Event::Key(key) = event::read()?
                        && let Some(command) = self.handle_key(key)
                    {
                        self.execute(command, &tx);
                    }
                }
                Some(event) = rx.recv() => {
                    self.apply_event(event);
                }
            }
        }
        Ok(())
    }
}
