use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use time::OffsetDateTime;

use crate::app::terminal::TerminalApp;
use crate::app::App;
use crate::catalog::Catalog;
use crate::comments::{local_now, Comment, CommentDraft, CommentStore, Persisted};
use crate::config::{AppConfig, PageOptions};
use crate::page::MemoryDocument;
use crate::render::{self, NO_RESULTS};
use crate::search::{self, Filter, Listing};
use crate::share::{self, Platform};

#[derive(Args, Debug, Clone, Default)]
pub struct PostsArgs {
    /// Case-insensitive text matched against title, excerpt and category
    #[arg(long, conflicts_with = "category")]
    pub search: Option<String>,
    /// Exact category name (`all` lists everything)
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CommentCommand {
    /// Post a comment on a post
    Add(CommentAddArgs),
    /// Print a post's comments in posting order
    List(PostRef),
    /// Print how many comments a post has
    Count(PostRef),
}

#[derive(Args, Debug, Clone)]
pub struct CommentAddArgs {
    /// Post identifier
    pub post_id: u32,
    /// Commenter name
    #[arg(long)]
    pub name: String,
    /// Comment text. If omitted, read from stdin.
    #[arg(long)]
    pub message: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PostRef {
    /// Post identifier
    pub post_id: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ShareArgs {
    /// twitter (or x), facebook, linkedin
    pub platform: Platform,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Write the page here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run_tui(catalog: Catalog, comments: CommentStore, config: &AppConfig) -> Result<()> {
    let doc = MemoryDocument::for_catalog(&catalog);
    let mut app = TerminalApp::new(App::new(catalog, comments, doc, config));
    app.run()
}

pub fn print_posts(catalog: &Catalog, args: PostsArgs) -> Result<()> {
    print!("{}", run_posts(catalog, &args));
    Ok(())
}

fn run_posts(catalog: &Catalog, args: &PostsArgs) -> String {
    let filter = match (&args.search, &args.category) {
        (Some(query), _) => Filter::query(query),
        (None, Some(category)) => Filter::category(category),
        (None, None) => Filter::All,
    };
    format_listing(&search::filter(catalog, &filter))
}

fn format_listing(listing: &Listing) -> String {
    if listing.shows_placeholder() {
        return format!("{NO_RESULTS}\n");
    }
    let mut out = String::new();
    for post in listing.posts() {
        let _ = writeln!(&mut out, "#{}  {}", post.id, post.title);
        let _ = writeln!(
            &mut out,
            "    {} • {}",
            post.category.to_uppercase(),
            post.date
        );
        let _ = writeln!(&mut out, "    {}", post.excerpt);
        out.push('\n');
    }
    out
}

pub fn handle_comment_command(
    catalog: &Catalog,
    comments: &CommentStore,
    args: CommentArgs,
) -> Result<()> {
    let output = match args.command {
        CommentCommand::Add(args) => {
            let message = match args.message.clone() {
                Some(message) => message,
                None => read_stdin()?.unwrap_or_default(),
            };
            let (comment, persisted) = add_comment(
                catalog,
                comments,
                args.post_id,
                CommentDraft::new(args.name, message),
                local_now(),
            )?;
            format_posted(args.post_id, &comment, persisted)
        }
        CommentCommand::List(post) => {
            ensure_post(catalog, post.post_id)?;
            format_comments(&comments.load_all(post.post_id))
        }
        CommentCommand::Count(post) => {
            ensure_post(catalog, post.post_id)?;
            format!("{}\n", comments.count(post.post_id))
        }
    };
    print!("{output}");
    Ok(())
}

fn ensure_post(catalog: &Catalog, post_id: u32) -> Result<()> {
    if !catalog.contains(post_id) {
        bail!("no post with id {post_id}");
    }
    Ok(())
}

fn add_comment(
    catalog: &Catalog,
    comments: &CommentStore,
    post_id: u32,
    draft: CommentDraft,
    at: OffsetDateTime,
) -> Result<(Comment, Persisted)> {
    ensure_post(catalog, post_id)?;
    let draft = draft.validate()?;
    let comment = draft.into_comment(at);
    let persisted = comments.append(post_id, &comment);
    Ok((comment, persisted))
}

fn format_posted(post_id: u32, comment: &Comment, persisted: Persisted) -> String {
    match persisted {
        Persisted::Stored => format!("Comment posted successfully! ({} on post #{post_id})\n", comment.date),
        Persisted::NotRetained => {
            format!("Comment accepted on post #{post_id} but storage is unavailable; it was not saved.\n")
        }
    }
}

fn format_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return "No comments yet.\n".to_string();
    }
    let mut out = String::new();
    for comment in comments {
        let _ = writeln!(&mut out, "{}  {}", comment.name, comment.date);
        for line in comment.message.lines() {
            let _ = writeln!(&mut out, "    {line}");
        }
    }
    out
}

pub fn print_share(page: &PageOptions, args: ShareArgs) -> Result<()> {
    println!("{}", share::share_url(args.platform, &page.url, &page.title));
    Ok(())
}

pub fn render_page(
    catalog: &Catalog,
    comments: &CommentStore,
    page: &PageOptions,
    args: RenderArgs,
) -> Result<()> {
    let html = render::page_html(catalog, comments, page);
    match args.output {
        Some(path) => {
            fs::write(&path, html).with_context(|| format!("writing page {}", path.display()))?;
            tracing::info!(path = %path.display(), "page rendered");
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading comment from stdin")?;
    Ok(Some(buf))
}
