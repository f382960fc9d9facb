use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use blogdeck::app::{App, SubmitOutcome, COMMENT_POSTED};
use blogdeck::catalog::Catalog;
use blogdeck::comments::{storage_key, CommentStore, Persisted};
use blogdeck::config::{AppConfig, ConfigPaths, StorageOptions};
use blogdeck::events::{DomEvent, Target};
use blogdeck::page::{MemoryDocument, Surface};
use blogdeck::router::{NavTarget, Section};
use blogdeck::storage::{self, KvStore, MemoryStore, StorageError};
use tempfile::TempDir;
use time::macros::datetime;

fn load_page(kv: Arc<dyn KvStore>) -> App<MemoryDocument> {
    let catalog = Catalog::builtin();
    let doc = MemoryDocument::for_catalog(&catalog);
    let mut app = App::new(catalog, CommentStore::new(kv), doc, &AppConfig::default())
        .with_clock(Box::new(|| datetime!(2024-03-07 12:00 UTC)));
    app.initialize();
    app
}

fn fill_comment(app: &mut App<MemoryDocument>, post_id: u32, name: &str, message: &str) {
    let doc = app.surface_mut();
    doc.set_input_value(&format!("commentName{post_id}"), name);
    doc.set_input_value(&format!("commentMessage{post_id}"), message);
}

fn submit(post_id: u32) -> DomEvent {
    DomEvent::submit(Target::new("form").with_id(format!("commentForm{post_id}")))
}

fn card_click(post_id: u32) -> DomEvent {
    DomEvent::click(vec![
        Target::new("p").with_class("excerpt"),
        Target::new("div").with_class("post-card-content"),
        Target::new("div")
            .with_class("post-card")
            .with_attr("data-post-id", post_id.to_string()),
        Target::new("div").with_id("postsGrid"),
    ])
}

#[test]
fn posting_a_comment_updates_store_count_and_notification() {
    let kv = MemoryStore::new();
    let mut app = load_page(Arc::new(kv));
    let now = Instant::now();
    let before = app.comments().count(2);

    fill_comment(&mut app, 2, "Ana", "Great post!");
    app.dispatch(&submit(2), now);

    let stored = app.comments().load_all(2);
    assert_eq!(stored.len(), before + 1);
    let last = stored.last().expect("comment stored");
    assert_eq!(last.name, "Ana");
    assert_eq!(last.message, "Great post!");
    assert_eq!(app.surface().text("commentCount2").as_deref(), Some("1"));
    assert_eq!(app.surface().notifications(), vec![COMMENT_POSTED]);

    app.on_tick(now + Duration::from_secs(3));
    assert!(app.surface().notifications().is_empty());
}

#[test]
fn comments_survive_a_reload() {
    let kv = MemoryStore::new();
    let mut first = load_page(Arc::new(kv.clone()));
    fill_comment(&mut first, 1, "Ana", "first");
    first.dispatch(&submit(1), Instant::now());
    fill_comment(&mut first, 1, "Ben", "second");
    first.dispatch(&submit(1), Instant::now());
    drop(first);

    let reloaded = load_page(Arc::new(kv));
    let names: Vec<_> = reloaded
        .comments()
        .load_all(1)
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Ana", "Ben"]);
    assert_eq!(reloaded.surface().text("commentCount1").as_deref(), Some("2"));
    let list = reloaded.surface().text("commentsList1").unwrap_or_default();
    assert!(list.find("first") < list.find("second"));
}

#[test]
fn sqlite_backed_page_replays_history() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let paths = ConfigPaths::rooted(temp.path());
    let options = StorageOptions::default();

    let mut app = load_page(Arc::new(storage::init(&paths, &options)?));
    fill_comment(&mut app, 3, "Ana", "persisted");
    app.dispatch(&submit(3), Instant::now());
    drop(app);

    let reloaded = load_page(Arc::new(storage::init(&paths, &options)?));
    assert_eq!(reloaded.surface().text("commentCount3").as_deref(), Some("1"));
    Ok(())
}

#[test]
fn corrupted_history_loads_as_empty() -> anyhow::Result<()> {
    let kv = MemoryStore::new();
    kv.set(&storage_key(1), "{not json")?;
    kv.set(&storage_key(2), "42")?;
    let app = load_page(Arc::new(kv));
    for post_id in [1, 2] {
        assert!(app.comments().load_all(post_id).is_empty());
        assert_eq!(
            app.surface().text(&format!("commentCount{post_id}")).as_deref(),
            Some("0")
        );
    }
    Ok(())
}

#[test]
fn comment_markup_never_interprets_user_input() {
    let mut app = load_page(Arc::new(MemoryStore::new()));
    fill_comment(&mut app, 1, "<b>x</b>", "<img src=x onerror=alert(1)>");
    app.dispatch(&submit(1), Instant::now());

    let markup = app.surface().inner_html("commentsList1").unwrap_or_default();
    assert!(!markup.contains("<b>"));
    assert!(!markup.contains("<img"));
    let text = app.surface().text("commentsList1").unwrap_or_default();
    assert!(text.contains("<b>x</b>"));
    assert!(text.contains("<img src=x onerror=alert(1)>"));
}

#[test]
fn search_results_and_placeholder() {
    let mut app = load_page(Arc::new(MemoryStore::new()));
    let search_btn = DomEvent::click(vec![Target::new("button").with_id("searchBtn")]);

    app.surface_mut().set_input_value("searchInput", "minimalism");
    app.dispatch(&search_btn, Instant::now());
    let listing = &app.state().listing;
    assert_eq!(listing.len(), 1);
    assert_eq!(listing.posts()[0].category, "lifestyle");

    app.surface_mut().set_input_value("searchInput", "zzz");
    app.dispatch(&search_btn, Instant::now());
    assert!(app.state().listing.is_empty());
    assert_eq!(
        app.surface().text("postsGrid").as_deref(),
        Some("No posts found matching your criteria.")
    );
}

#[test]
fn category_filter_then_nav_reaches_post_one() {
    let mut app = load_page(Arc::new(MemoryStore::new()));
    app.surface_mut().set_input_value("categoryFilter", "ai");
    app.dispatch(
        &DomEvent::change(Target::new("select").with_id("categoryFilter")),
        Instant::now(),
    );
    assert_eq!(app.state().listing.ids(), vec![2]);
    assert_eq!(app.surface().visible_sections(), vec!["home"]);

    app.dispatch(
        &DomEvent::click(vec![Target::new("a")
            .with_class("nav-link")
            .with_attr("href", "#")
            .with_attr("data-post", "1")]),
        Instant::now(),
    );
    assert_eq!(app.state().router.active(), Section::Post(1));
    assert_eq!(app.surface().visible_sections(), vec!["post1"]);
    assert_eq!(app.surface().active_nav(), vec![NavTarget::Post(1)]);
}

#[test]
fn re_rendered_cards_stay_clickable_without_new_bindings() {
    let mut app = load_page(Arc::new(MemoryStore::new()));
    let bindings = app.bindings().len();
    for query in ["web", "learning", "", "balance"] {
        app.surface_mut().set_input_value("searchInput", query);
        app.dispatch(
            &DomEvent::keypress(Target::new("input").with_id("searchInput"), "Enter"),
            Instant::now(),
        );
    }
    assert_eq!(app.bindings().len(), bindings);
    assert_eq!(app.state().listing.ids(), vec![3]);

    app.dispatch(&card_click(3), Instant::now());
    assert_eq!(app.surface().visible_sections(), vec!["post3"]);
    assert_eq!(app.surface().active_nav(), vec![NavTarget::Post(3)]);
}

#[test]
fn every_transition_leaves_one_section_visible() {
    let mut app = load_page(Arc::new(MemoryStore::new()));
    let events = [
        card_click(2),
        DomEvent::change(Target::new("select").with_id("categoryFilter")),
        card_click(1),
        DomEvent::click(vec![Target::new("a")
            .with_class("nav-link")
            .with_attr("href", "#")
            .with_attr("data-post", "all")]),
    ];
    for event in &events {
        app.dispatch(event, Instant::now());
        assert_eq!(app.surface().visible_sections().len(), 1);
        assert!(app.surface().active_nav().len() <= 1);
    }
}

#[test]
fn identical_double_submit_keeps_both() {
    let mut app = load_page(Arc::new(MemoryStore::new()));
    for _ in 0..2 {
        fill_comment(&mut app, 1, "Ana", "same");
        app.dispatch(&submit(1), Instant::now());
    }
    assert_eq!(app.comments().count(1), 2);
    assert_eq!(app.surface().notifications().len(), 2);
}

struct ReadOnly(MemoryStore);

impl KvStore for ReadOnly {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded {
            key: key.to_string(),
        })
    }
}

#[test]
fn failed_write_still_renders_for_the_session() {
    let mut app = load_page(Arc::new(ReadOnly(MemoryStore::new())));
    fill_comment(&mut app, 2, "Ana", "kept on screen");
    let outcome = app.submit_comment(2, Instant::now());
    assert_matches!(
        outcome,
        SubmitOutcome::Posted {
            persisted: Persisted::NotRetained,
            ..
        }
    );
    let text = app.surface().text("commentsList2").unwrap_or_default();
    assert!(text.contains("kept on screen"));
    assert_eq!(app.comments().count(2), 0);
    assert_eq!(app.surface().notifications(), vec![COMMENT_POSTED]);
}
