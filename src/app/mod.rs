use std::str::FromStr;
use std::time::Instant;

use time::OffsetDateTime;

use crate::catalog::Catalog;
use crate::comments::{local_now, Comment, CommentDraft, CommentStore, Persisted};
use crate::config::{AppConfig, PageOptions};
use crate::events::{BindingTable, DomEvent, HandlerKind, Matched, Target};
use crate::notify::Notifier;
use crate::page::Surface;
use crate::render;
use crate::router::{NavTarget, Transition};
use crate::search::{Filter, Listing};
use crate::share::{Platform, WINDOW_FEATURES, WINDOW_TARGET};

mod actions;
pub mod state;
pub mod terminal;

pub use state::{AppState, Focus, InputField, ViewState};

pub const COMMENT_POSTED: &str = "Comment posted successfully!";

pub type Clock = Box<dyn Fn() -> OffsetDateTime + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Posted {
        comment: Comment,
        persisted: Persisted,
    },
    Rejected,
    MissingForm,
}

pub struct App<D: Surface> {
    state: AppState,
    surface: D,
    bindings: BindingTable,
    comments: CommentStore,
    notifier: Notifier,
    page: PageOptions,
    clock: Clock,
}

impl<D: Surface> App<D> {
    pub fn new(catalog: Catalog, comments: CommentStore, surface: D, config: &AppConfig) -> Self {
        Self {
            state: AppState::new(catalog),
            surface,
            bindings: BindingTable::standard(),
            comments,
            notifier: Notifier::new(config.notifications.lifetime),
            page: config.page.clone(),
            clock: Box::new(local_now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut D {
        &mut self.surface
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    /// Page load: home with `all` active, every post rendered, persisted
    /// comments replayed with their counts.
    pub fn initialize(&mut self) {
        let transition = self.state.router.navigate(NavTarget::All);
        self.apply_transition(transition);
        let listing = self.state.apply_filter(Filter::All).clone();
        self.render_listing(&listing);

        let ids: Vec<u32> = self.state.catalog.ids().collect();
        for post_id in ids {
            let history = self.comments.load_all(post_id);
            for comment in &history {
                self.surface.append_html(
                    &format!("commentsList{post_id}"),
                    &render::comment_markup(comment),
                );
            }
            self.update_comment_count(post_id);
        }
        tracing::info!(posts = self.state.catalog.len(), "page initialised");
    }

    pub fn dispatch(&mut self, event: &DomEvent, now: Instant) -> Vec<HandlerKind> {
        let matched = self.bindings.resolve(event);
        for hit in &matched {
            self.run_handler(*hit, event, now);
        }
        matched.into_iter().map(|hit| hit.handler).collect()
    }

    pub fn on_tick(&mut self, now: Instant) {
        for id in self.notifier.expire(now) {
            self.surface.remove_notification(id);
        }
    }

    fn run_handler(&mut self, hit: Matched<'_>, event: &DomEvent, now: Instant) {
        let element = hit.element;
        match hit.handler {
            HandlerKind::Navigate => {
                if let Some(target) = element.and_then(|el| el.attr("data-post")) {
                    self.handle_navigation(target);
                }
            }
            HandlerKind::ToggleMenu => {
                let open = self.surface.menu_open();
                self.surface.set_menu_open(!open);
            }
            HandlerKind::Search => self.handle_search(),
            HandlerKind::SearchKey => {
                if event.key.as_deref() == Some("Enter") {
                    self.handle_search();
                }
            }
            HandlerKind::CategoryChange => self.handle_category_change(),
            HandlerKind::OpenPost => {
                match element
                    .and_then(|el| el.attr("data-post-id"))
                    .and_then(|raw| raw.parse::<u32>().ok())
                {
                    Some(post_id) => self.open_post(post_id),
                    None => tracing::debug!("post card without a usable data-post-id"),
                }
            }
            HandlerKind::SubmitComment => {
                if let Some(post_id) = element.and_then(form_post_id) {
                    self.submit_comment(post_id, now);
                }
            }
            HandlerKind::Share => {
                if let Some(platform) = element.and_then(|el| el.attr("data-platform")) {
                    self.handle_share(platform);
                }
            }
            HandlerKind::Resize => self.handle_resize(),
            HandlerKind::AnchorScroll => {
                if let Some(href) = element.and_then(|el| el.attr("href")) {
                    let id = href.trim_start_matches('#');
                    if !id.is_empty() {
                        self.surface.scroll_into_view(id);
                    }
                }
            }
        }
    }

    pub fn handle_navigation(&mut self, data_post: &str) {
        let Some(target) = NavTarget::parse(data_post) else {
            tracing::debug!(data_post, "ignoring nav control with unknown target");
            return;
        };
        let transition = self.state.router.navigate(target);
        self.apply_transition(transition);
        self.surface.set_menu_open(false);
    }

    pub fn open_post(&mut self, post_id: u32) {
        let transition = self.state.router.open_post(post_id);
        self.apply_transition(transition);
    }

    pub fn handle_search(&mut self) {
        let raw = self.surface.input_value("searchInput").unwrap_or_default();
        let filter = Filter::query(&raw);
        if !filter.is_applied() {
            // cleared search only restores the grid, the route stays put
            let listing = self.state.apply_filter(Filter::All).clone();
            self.render_listing(&listing);
            return;
        }
        let listing = self.state.apply_filter(filter).clone();
        self.render_listing(&listing);
        let transition = self.state.router.show_results();
        self.apply_transition(transition);
    }

    pub fn handle_category_change(&mut self) {
        let Some(raw) = self.surface.input_value("categoryFilter") else {
            tracing::debug!("category filter not present");
            return;
        };
        let listing = self.state.apply_filter(Filter::category(&raw)).clone();
        self.render_listing(&listing);
        let transition = self.state.router.show_results();
        self.apply_transition(transition);
    }

    pub fn handle_share(&mut self, platform: &str) {
        let Ok(platform) = Platform::from_str(platform) else {
            tracing::debug!(platform, "ignoring share button for unknown platform");
            return;
        };
        let url = actions::ActionDispatcher::new(&self.comments, &self.page).share_link(platform);
        self.surface.open_window(&url, WINDOW_TARGET, WINDOW_FEATURES);
    }

    pub fn handle_resize(&mut self) {
        if self.surface.viewport_width() > self.page.mobile_breakpoint {
            self.surface.set_menu_open(false);
        }
    }

    pub fn submit_comment(&mut self, post_id: u32, now: Instant) -> SubmitOutcome {
        let name_id = format!("commentName{post_id}");
        let message_id = format!("commentMessage{post_id}");
        let (Some(name), Some(message)) = (
            self.surface.input_value(&name_id),
            self.surface.input_value(&message_id),
        ) else {
            tracing::debug!(post_id, "comment form not present");
            return SubmitOutcome::MissingForm;
        };

        let draft = match CommentDraft::new(name, message).validate() {
            Ok(draft) => draft,
            Err(err) => {
                self.surface.alert(&err.to_string());
                return SubmitOutcome::Rejected;
            }
        };

        let comment = draft.into_comment((self.clock)());
        let dispatcher = actions::ActionDispatcher::new(&self.comments, &self.page);
        let persisted = dispatcher.post_comment(post_id, &comment);
        self.surface.append_html(
            &format!("commentsList{post_id}"),
            &render::comment_markup(&comment),
        );
        self.update_comment_count(post_id);
        self.surface.set_input_value(&name_id, "");
        self.surface.set_input_value(&message_id, "");
        self.notify(COMMENT_POSTED, now);
        SubmitOutcome::Posted { comment, persisted }
    }

    pub fn notify(&mut self, message: &str, now: Instant) {
        let notification = self.notifier.push(message, now);
        let id = notification.id;
        self.surface.show_notification(id, message);
    }

    fn update_comment_count(&mut self, post_id: u32) {
        let count = actions::ActionDispatcher::new(&self.comments, &self.page).comment_count(post_id);
        self.surface
            .set_text(&format!("commentCount{post_id}"), &count.to_string());
    }

    fn render_listing(&mut self, listing: &Listing) {
        self.surface
            .set_inner_html("postsGrid", &render::posts_markup(listing));
    }

    fn apply_transition(&mut self, transition: Transition) {
        let visible = transition.to.element_id();
        for id in self.surface.section_ids() {
            self.surface.set_section_visible(&id, id == visible);
        }
        for target in self.surface.nav_targets() {
            self.surface
                .set_nav_active(target, transition.active_nav == Some(target));
        }
        if transition.scroll_to_top {
            self.surface.scroll_to_top();
        }
    }
}

fn form_post_id(form: &Target) -> Option<u32> {
    form.id.as_deref()?.strip_prefix("commentForm")?.parse().ok()
}
