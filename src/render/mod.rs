use crate::catalog::{Catalog, Post};
use crate::comments::{Comment, CommentStore};
use crate::config::PageOptions;
use crate::router::{NavTarget, Section};
use crate::search::{Listing, ALL_CATEGORIES};
use crate::share::Platform;

pub const NO_RESULTS: &str = "No posts found matching your criteria.";

/// Serializes `text` the way a text node's contents come back out of
/// `innerHTML`: only `&`, `<`, `>` and no-break spaces are rewritten.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            ch => out.push(ch),
        }
    }
    out
}

/// Attribute values additionally need the double quote escaped.
pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Visible text of a markup fragment: tags dropped, the common entities decoded.
pub fn text_content(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut chars = markup.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '<' => {
                for inner in chars.by_ref() {
                    if inner == '>' {
                        break;
                    }
                }
            }
            '&' => {
                let mut entity = String::new();
                while let Some(&next) = chars.peek() {
                    if next == ';' || entity.len() > 8 {
                        break;
                    }
                    entity.push(next);
                    chars.next();
                }
                if chars.peek() == Some(&';') {
                    chars.next();
                    match decode_entity(&entity) {
                        Some(decoded) => out.push(decoded),
                        None => {
                            out.push('&');
                            out.push_str(&entity);
                            out.push(';');
                        }
                    }
                } else {
                    out.push('&');
                    out.push_str(&entity);
                }
            }
            ch => out.push(ch),
        }
    }
    out
}

/// Text of every element opened with `class="<class>"`, in document order.
/// Only meaningful for leaf elements whose content is escaped text.
pub fn text_of_class(markup: &str, class: &str) -> Vec<String> {
    let needle = format!(r#"class="{class}">"#);
    markup
        .match_indices(&needle)
        .map(|(start, _)| {
            let rest = &markup[start + needle.len()..];
            let end = rest.find('<').unwrap_or(rest.len());
            text_content(&rest[..end])
        })
        .collect()
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "nbsp" => Some('\u{a0}'),
        "#39" => Some('\''),
        _ => None,
    }
}

pub fn post_card_markup(post: &Post) -> String {
    format!(
        concat!(
            r#"<div class="post-card" data-post-id="{id}">"#,
            r#"<img src="{image}" alt="{title}">"#,
            r#"<div class="post-card-content">"#,
            r#"<div class="meta"><span class="category {category}">{category_label}</span><span class="date">{date}</span></div>"#,
            r#"<h3>{title}</h3><p class="excerpt">{excerpt}</p>"#,
            r#"</div></div>"#
        ),
        id = post.id,
        image = post.image,
        title = post.title,
        category = post.category,
        category_label = post.category.to_uppercase(),
        date = post.date,
        excerpt = post.excerpt,
    )
}

/// Cards for every listed post, or the placeholder when a filter matched
/// nothing.
pub fn posts_markup(listing: &Listing) -> String {
    if listing.shows_placeholder() {
        return format!(r#"<p class="no-results">{NO_RESULTS}</p>"#);
    }
    listing
        .posts()
        .iter()
        .map(post_card_markup)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn comment_markup(comment: &Comment) -> String {
    format!(
        concat!(
            r#"<div class="comment-item">"#,
            r#"<div class="comment-header"><span class="comment-author">{name}</span><span class="comment-date">{date}</span></div>"#,
            r#"<div class="comment-text">{message}</div>"#,
            r#"</div>"#
        ),
        name = escape_text(&comment.name),
        date = escape_text(&comment.date),
        message = escape_text(&comment.message),
    )
}

pub fn comments_markup(comments: &[Comment]) -> String {
    comments.iter().map(comment_markup).collect()
}

fn nav_markup(catalog: &Catalog) -> String {
    let mut items = vec![format!(
        r##"<li><a href="#" class="nav-link" data-post="{}">Home</a></li>"##,
        NavTarget::All.data_attr()
    )];
    for post in catalog.posts() {
        items.push(format!(
            r##"<li><a href="#" class="nav-link" data-post="{}">{}</a></li>"##,
            NavTarget::Post(post.id).data_attr(),
            post.title
        ));
    }
    format!(
        concat!(
            r#"<nav class="navbar"><button class="mobile-toggle" id="mobileToggle">&#9776;</button>"#,
            r#"<ul class="nav-menu">{}</ul></nav>"#
        ),
        items.join("")
    )
}

fn category_select_markup(catalog: &Catalog) -> String {
    let mut options = vec![format!(
        r#"<option value="{ALL_CATEGORIES}">All Categories</option>"#
    )];
    for category in catalog.categories() {
        options.push(format!(
            r#"<option value="{category}">{}</option>"#,
            capitalize(&category)
        ));
    }
    format!(
        r#"<select id="categoryFilter">{}</select>"#,
        options.join("")
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn post_section_markup(post: &Post, comments: &[Comment]) -> String {
    let id = post.id;
    let share_buttons: String = Platform::ALL
        .iter()
        .map(|platform| {
            format!(
                r#"<button class="share-btn" data-platform="{platform}">{}</button>"#,
                platform.label()
            )
        })
        .collect();
    format!(
        concat!(
            r#"<section class="content-section" id="{section}">"#,
            r#"<article class="post-detail"><img src="{image}" alt="{title}">"#,
            r#"<h1>{title}</h1><div class="meta"><span class="category {category}">{category_label}</span><span class="date">{date}</span></div>"#,
            r#"<p>{excerpt}</p>"#,
            r#"<div class="share-buttons">{share}</div></article>"#,
            r#"<div class="comments"><h3>Comments (<span id="commentCount{id}">{count}</span>)</h3>"#,
            r#"<form id="commentForm{id}">"#,
            r#"<input type="text" id="commentName{id}" placeholder="Your name">"#,
            r#"<textarea id="commentMessage{id}" placeholder="Your comment"></textarea>"#,
            r#"<button type="submit">Post Comment</button></form>"#,
            r#"<div class="comments-list" id="commentsList{id}">{comments}</div></div>"#,
            r#"</section>"#
        ),
        section = Section::Post(id).element_id(),
        image = post.image,
        title = post.title,
        category = post.category,
        category_label = post.category.to_uppercase(),
        date = post.date,
        excerpt = post.excerpt,
        share = share_buttons,
        id = id,
        count = comments.len(),
        comments = comments_markup(comments),
    )
}

/// Complete static page in its initial state: home visible, `all` active,
/// persisted comments already replayed into each post.
pub fn page_html(catalog: &Catalog, comments: &CommentStore, page: &PageOptions) -> String {
    let listing = Listing::unfiltered(catalog);
    let sections: String = catalog
        .posts()
        .iter()
        .map(|post| post_section_markup(post, &comments.load_all(post.id)))
        .collect::<Vec<_>>()
        .join("\n");
    let nav = nav_markup(catalog).replacen(
        r#"class="nav-link" data-post="all""#,
        r#"class="nav-link active" data-post="all""#,
        1,
    );
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n",
            "<title>{title}</title>\n",
            "<link rel=\"canonical\" href=\"{url}\">\n",
            "</head>\n<body>\n{nav}\n<main>\n",
            "<section class=\"content-section active\" id=\"home\">",
            "<div class=\"search-bar\"><input type=\"text\" id=\"searchInput\" placeholder=\"Search posts...\">",
            "<button id=\"searchBtn\">Search</button>{select}</div>",
            "<div class=\"posts-grid\" id=\"postsGrid\">\n{cards}\n</div></section>\n",
            "{sections}\n</main>\n</body>\n</html>\n"
        ),
        title = escape_text(&page.title),
        url = escape_attr(&page.url),
        nav = nav,
        select = category_select_markup(catalog),
        cards = posts_markup(&listing),
        sections = sections,
    )
}
