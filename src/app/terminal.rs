use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use super::state::{Focus, InputField, ViewState};
use super::App;
use crate::events::{DomEvent, Target};
use crate::page::{MemoryDocument, Surface};
use crate::router::{NavTarget, Section};
use crate::search::ALL_CATEGORIES;
use crate::share::Platform;
use crate::ui;

/// Approximate pixels per terminal column, used to feed the resize handler.
const COLUMN_PX: u32 = 8;

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    NextNav,
    PreviousNav,
    OpenSelected,
    Home,
    StartSearch,
    CycleCategory,
    StartComment,
    Share(Platform),
    ToggleMenu,
}

/// Keyboard front end that drives the page through the same event table as
/// the headless document.
pub struct TerminalApp {
    page: App<MemoryDocument>,
    view: ViewState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl TerminalApp {
    pub fn new(mut page: App<MemoryDocument>) -> Self {
        page.initialize();
        Self {
            page,
            view: ViewState::default(),
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn page(&self) -> &App<MemoryDocument> {
        &self.page
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        if let Ok(size) = terminal.size() {
            self.resize(size.width);
        }
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    if self.page.state().listing.is_empty() {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(self.view.selected));
                    }
                    ui::draw_app(frame, &self.page, &self.view, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(cols, _) => self.resize(cols),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.page.on_tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    pub fn resize(&mut self, cols: u16) {
        self.page
            .surface_mut()
            .set_viewport_width(u32::from(cols) * COLUMN_PX);
        self.fire(DomEvent::resize());
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.view.is_editing() {
            self.handle_input_key(key);
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Tab => Some(Action::NextNav),
            KeyCode::BackTab => Some(Action::PreviousNav),
            KeyCode::Enter => Some(Action::OpenSelected),
            KeyCode::Esc => Some(Action::Home),
            KeyCode::Char('/') if plain => Some(Action::StartSearch),
            KeyCode::Char('c') if plain => Some(Action::CycleCategory),
            KeyCode::Char('n') if plain => Some(Action::StartComment),
            KeyCode::Char('1') => Some(Action::Share(Platform::Twitter)),
            KeyCode::Char('2') => Some(Action::Share(Platform::Facebook)),
            KeyCode::Char('3') => Some(Action::Share(Platform::LinkedIn)),
            KeyCode::Char('m') if plain => Some(Action::ToggleMenu),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.move_selection(1),
            Action::SelectPrevious => self.move_selection(-1),
            Action::NextNav => self.step_nav(1),
            Action::PreviousNav => self.step_nav(-1),
            Action::OpenSelected => self.open_selected(),
            Action::Home => self.fire(nav_click(NavTarget::All)),
            Action::StartSearch => {
                self.begin_input(Focus::Search, "searchInput".to_string());
                self.set_status(Some("Search: type a query, Enter to apply, Esc to cancel"));
            }
            Action::CycleCategory => self.cycle_category(),
            Action::StartComment => match self.page.state().router.active() {
                Section::Post(id) => {
                    self.begin_input(Focus::CommentName, format!("commentName{id}"));
                    self.set_status(Some("Name: Enter for the message field, Esc to cancel"));
                }
                Section::Home => self.set_status(Some("Open a post to leave a comment")),
            },
            Action::Share(platform) => self.share(platform),
            Action::ToggleMenu => self.fire(DomEvent::click(vec![
                Target::new("button").with_id("mobileToggle")
            ])),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.view.focus = Focus::Browse;
                self.set_status(None::<String>);
            }
            KeyCode::Enter => self.commit_input(),
            KeyCode::Tab if self.view.focus == Focus::CommentName => self.commit_input(),
            KeyCode::Backspace => {
                if self.view.input.backspace() {
                    self.sync_input();
                }
            }
            KeyCode::Left => {
                self.view.input.move_left();
            }
            KeyCode::Right => {
                self.view.input.move_right();
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.view.input.insert_char(ch);
                self.sync_input();
            }
            _ => {}
        }
    }

    fn commit_input(&mut self) {
        match (self.view.focus, self.page.state().router.active()) {
            (Focus::Search, _) => {
                self.view.focus = Focus::Browse;
                self.fire(DomEvent::keypress(
                    Target::new("input").with_id("searchInput"),
                    "Enter",
                ));
                self.view.selected = 0;
                let found = self.page.state().listing.len();
                self.set_status(Some(format!("{found} post(s) listed")));
            }
            (Focus::CommentName, Section::Post(id)) => {
                self.begin_input(Focus::CommentMessage, format!("commentMessage{id}"));
                self.set_status(Some("Message: Enter to post, Esc to cancel"));
            }
            (Focus::CommentMessage, Section::Post(id)) => {
                self.fire(DomEvent::submit(
                    Target::new("form").with_id(format!("commentForm{id}")),
                ));
                let alerts = self.page.surface_mut().take_alerts();
                match alerts.last() {
                    Some(alert) => {
                        self.set_status(Some(alert.clone()));
                        self.begin_input(Focus::CommentName, format!("commentName{id}"));
                    }
                    None => {
                        self.view.focus = Focus::Browse;
                        self.set_status(None::<String>);
                    }
                }
            }
            _ => self.view.focus = Focus::Browse,
        }
    }

    fn begin_input(&mut self, focus: Focus, element_id: String) {
        let current = self
            .page
            .surface()
            .input_value(&element_id)
            .unwrap_or_default();
        self.view.input = InputField::with_text(&current);
        self.view.focus = focus;
    }

    /// Mirrors the edited text into the page input that owns it.
    fn sync_input(&mut self) {
        let Some(element_id) = self.focused_element() else {
            return;
        };
        let text = self.view.input.text().to_string();
        self.page.surface_mut().set_input_value(&element_id, &text);
    }

    fn focused_element(&self) -> Option<String> {
        let post = match self.page.state().router.active() {
            Section::Post(id) => Some(id),
            Section::Home => None,
        };
        match self.view.focus {
            Focus::Browse => None,
            Focus::Search => Some("searchInput".to_string()),
            Focus::CommentName => post.map(|id| format!("commentName{id}")),
            Focus::CommentMessage => post.map(|id| format!("commentMessage{id}")),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.page.state().listing.len();
        self.view.move_selection(delta, len);
    }

    fn open_selected(&mut self) {
        if self.page.state().router.active() != Section::Home {
            return;
        }
        let Some(post) = self.page.state().listing.posts().get(self.view.selected) else {
            return;
        };
        let event = DomEvent::click(vec![
            Target::new("h3"),
            Target::new("div").with_class("post-card-content"),
            Target::new("div")
                .with_class("post-card")
                .with_attr("data-post-id", post.id.to_string()),
            Target::new("div").with_id("postsGrid"),
        ]);
        self.fire(event);
    }

    fn step_nav(&mut self, delta: isize) {
        let targets = self.page.surface().nav_targets();
        if targets.is_empty() {
            return;
        }
        let current = self
            .page
            .state()
            .router
            .active_nav()
            .and_then(|active| targets.iter().position(|t| *t == active))
            .unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(targets.len() as isize) as usize;
        self.fire(nav_click(targets[next]));
    }

    fn cycle_category(&mut self) {
        let mut options = vec![ALL_CATEGORIES.to_string()];
        options.extend(self.page.state().catalog.categories());
        let current = self
            .page
            .surface()
            .input_value("categoryFilter")
            .unwrap_or_default();
        let index = options.iter().position(|o| *o == current).unwrap_or(0);
        let next = options[(index + 1) % options.len()].clone();
        self.page
            .surface_mut()
            .set_input_value("categoryFilter", &next);
        self.fire(DomEvent::change(Target::new("select").with_id("categoryFilter")));
        self.view.selected = 0;
        self.set_status(Some(format!("Category: {next}")));
    }

    fn share(&mut self, platform: Platform) {
        if !matches!(self.page.state().router.active(), Section::Post(_)) {
            self.set_status(Some("Open a post to share it"));
            return;
        }
        self.fire(DomEvent::click(vec![
            Target::new("button")
                .with_class("share-btn")
                .with_attr("data-platform", platform.to_string()),
        ]));
        let opened = self.page.surface().windows().last().map(|w| w.url.clone());
        if let Some(url) = opened {
            self.set_status(Some(format!("Share on {}: {url}", platform.label())));
        }
    }

    fn fire(&mut self, event: DomEvent) {
        let handled = self.page.dispatch(&event, Instant::now());
        if handled.is_empty() {
            tracing::debug!(?event.kind, "event had no bound handler");
        }
    }

    fn set_status<S: Into<String>>(&mut self, message: Option<S>) {
        self.page.state_mut().set_status_message(message);
    }
}

fn nav_click(target: NavTarget) -> DomEvent {
    DomEvent::click(vec![Target::new("a")
        .with_class("nav-link")
        .with_attr("href", "#")
        .with_attr("data-post", target.data_attr())])
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::Catalog;
    use crate::comments::CommentStore;
    use crate::config::AppConfig;
    use crate::storage::MemoryStore;

    fn terminal_app() -> TerminalApp {
        let catalog = Catalog::builtin();
        let doc = MemoryDocument::for_catalog(&catalog);
        let store = CommentStore::new(Arc::new(MemoryStore::new()));
        TerminalApp::new(App::new(catalog, store, doc, &AppConfig::default()))
    }

    fn press(app: &mut TerminalApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut TerminalApp, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn keyboard_search_filters_listing() {
        let mut app = terminal_app();
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "minimalism");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.page().state().listing.ids(), vec![3]);
        assert_eq!(app.view().focus, Focus::Browse);
    }

    #[test]
    fn keyboard_comment_flow_posts_and_returns_to_browse() {
        let mut app = terminal_app();
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.page().state().router.active(), Section::Post(2));

        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Ana");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "Great post!");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.page().comments().count(2), 1);
        assert_eq!(app.view().focus, Focus::Browse);
        assert_eq!(app.page().surface().notifications().len(), 1);
    }

    #[test]
    fn blank_comment_keeps_form_open_with_alert() {
        let mut app = terminal_app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.page().state().router.active(), Section::Post(1));
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view().focus, Focus::CommentName);
        assert_eq!(
            app.page().state().status_message.as_deref(),
            Some("Please fill in both name and message fields.")
        );
    }

    #[test]
    fn category_key_cycles_through_catalog_categories() {
        let mut app = terminal_app();
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.page().state().listing.ids(), vec![1]);
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.page().state().listing.ids(), vec![2]);
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.page().state().listing.len(), 3);
    }

    #[test]
    fn narrow_terminal_keeps_menu_until_widened() {
        let mut app = terminal_app();
        app.resize(80);
        press(&mut app, KeyCode::Char('m'));
        assert!(app.page().surface().menu_open());
        app.resize(120);
        assert!(!app.page().surface().menu_open());
    }
}
