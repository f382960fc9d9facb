use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{Focus, ViewState};
use crate::app::App;
use crate::catalog::Post;
use crate::highlight::{segments, term_regex};
use crate::page::{MemoryDocument, Surface};
use crate::render::{self, NO_RESULTS};
use crate::router::{NavTarget, Section};
use crate::share::Platform;

pub fn draw_app(
    frame: &mut Frame,
    page: &App<MemoryDocument>,
    view: &ViewState,
    list_state: &mut ListState,
) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(frame.size());

    draw_nav(frame, page, vertical[0]);
    match page.state().router.active() {
        Section::Home => draw_home(frame, page, view, list_state, vertical[1]),
        Section::Post(id) => draw_post(frame, page, view, id, vertical[1]),
    }

    let status = build_status_line(page, view);
    let status_paragraph = Paragraph::new(status).style(Style::default().fg(Color::Gray));
    frame.render_widget(status_paragraph, vertical[2]);

    if page.surface().menu_open() {
        draw_menu(frame, page, vertical[1]);
    }
    draw_notifications(frame, page);
}

fn nav_label(page: &App<MemoryDocument>, target: NavTarget) -> String {
    match target {
        NavTarget::All => "Home".to_string(),
        NavTarget::Post(id) => page
            .state()
            .catalog
            .get(id)
            .map(|post| truncate_to_width(&post.title, 24))
            .unwrap_or_else(|| format!("Post {id}")),
    }
}

fn draw_nav(frame: &mut Frame, page: &App<MemoryDocument>, area: Rect) {
    let active = page.surface().active_nav();
    let mut spans = Vec::new();
    for (index, target) in page.surface().nav_targets().into_iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if active.contains(&target) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(nav_label(page, target), style));
    }
    let title = if page.surface().menu_open() {
        "☰ Menu (open)"
    } else {
        "☰ Menu"
    };
    let nav = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(nav, area);
}

fn draw_home(
    frame: &mut Frame,
    page: &App<MemoryDocument>,
    view: &ViewState,
    list_state: &mut ListState,
    area: Rect,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(2)])
        .split(area);

    let doc = page.surface();
    let query = if view.focus == Focus::Search {
        view.input.text().to_string()
    } else {
        doc.input_value("searchInput").unwrap_or_default()
    };
    let category = doc.input_value("categoryFilter").unwrap_or_default();
    let search_style = if view.focus == Focus::Search {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let search_line = Line::from(vec![
        Span::styled("Search: ", Style::default().fg(Color::Gray)),
        Span::raw(query),
        Span::styled("   Category: ", Style::default().fg(Color::Gray)),
        Span::styled(category, Style::default().add_modifier(Modifier::BOLD)),
    ]);
    let search = Paragraph::new(search_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(search_style),
    );
    frame.render_widget(search, rows[0]);
    if view.focus == Focus::Search {
        let typed = &view.input.text()[..view.input.cursor()];
        let x = rows[0].x + 1 + "Search: ".width() as u16 + typed.width() as u16;
        frame.set_cursor(x.min(rows[0].right().saturating_sub(2)), rows[0].y + 1);
    }

    let listing = &page.state().listing;
    let block = Block::default()
        .title(format!("Posts ({})", listing.len()))
        .borders(Borders::ALL);
    if listing.shows_placeholder() {
        let empty = Paragraph::new(Span::styled(
            NO_RESULTS,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ))
        .block(block);
        frame.render_widget(empty, rows[1]);
        return;
    }

    let regex = term_regex(&page.state().filter.highlight_terms());
    let items: Vec<ListItem> = listing
        .posts()
        .iter()
        .map(|post| ListItem::new(card_lines(post, regex.as_ref())))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, rows[1], list_state);
}

fn card_lines(post: &Post, regex: Option<&Regex>) -> Vec<Line<'static>> {
    let highlight = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    vec![
        Line::from(highlight_spans(
            &post.title,
            regex,
            highlight,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                post.category.to_uppercase(),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled(format!(" • {}", post.date), Style::default().fg(Color::Gray)),
        ]),
        Line::from(highlight_spans(&post.excerpt, regex, highlight, Style::default())),
        Line::from(""),
    ]
}

fn highlight_spans(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    segments(text, regex)
        .into_iter()
        .map(|segment| {
            let style = if segment.matched {
                highlight_style
            } else {
                base_style
            };
            Span::styled(segment.text.to_string(), style)
        })
        .collect()
}

fn draw_post(frame: &mut Frame, page: &App<MemoryDocument>, view: &ViewState, id: u32, area: Rect) {
    let doc = page.surface();
    let visible = doc.visible_sections();
    let Some(post) = page
        .state()
        .catalog
        .get(id)
        .filter(|_| visible.contains(&Section::Post(id).element_id().as_str()))
    else {
        let missing = Paragraph::new("This post is not on the page. Press Esc to go home.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(missing, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            post.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                post.category.to_uppercase(),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled(format!(" • {}", post.date), Style::default().fg(Color::Gray)),
        ]),
        Line::from(""),
        Line::from(post.excerpt.clone()),
        Line::from(""),
    ];

    let share: Vec<Span> = Platform::ALL
        .iter()
        .enumerate()
        .flat_map(|(index, platform)| {
            vec![
                Span::styled(
                    format!("[{}]", index + 1),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" {}  ", platform.label())),
            ]
        })
        .collect();
    let mut share_line = vec![Span::styled("Share: ", Style::default().fg(Color::Gray))];
    share_line.extend(share);
    lines.push(Line::from(share_line));
    lines.push(Line::from(""));

    let count = doc
        .text(&format!("commentCount{id}"))
        .unwrap_or_else(|| "0".to_string());
    lines.push(Line::from(Span::styled(
        format!("Comments ({count})"),
        Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    )));
    let list_markup = doc
        .inner_html(&format!("commentsList{id}"))
        .unwrap_or_default();
    let authors = render::text_of_class(list_markup, "comment-author");
    let dates = render::text_of_class(list_markup, "comment-date");
    let messages = render::text_of_class(list_markup, "comment-text");
    if authors.is_empty() {
        lines.push(Line::from(Span::styled(
            "No comments yet.",
            Style::default().fg(Color::Gray),
        )));
    }
    for ((author, date), message) in authors.iter().zip(&dates).zip(&messages) {
        lines.push(Line::from(vec![
            Span::styled(author.clone(), Style::default().fg(Color::Cyan)),
            Span::styled(format!("  {date}"), Style::default().fg(Color::Gray)),
        ]));
        lines.push(Line::from(format!("  {message}")));
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(4)])
        .split(area);
    let detail = Paragraph::new(Text::from(lines))
        .block(Block::default().title(Section::Post(id).element_id()).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, rows[0]);

    let field = |focus: Focus, element_id: String| -> String {
        if view.focus == focus {
            let mut text = view.input.text().to_string();
            text.push('▌');
            text
        } else {
            doc.input_value(&element_id).unwrap_or_default()
        }
    };
    let label_style = |focus: Focus| {
        if view.focus == focus {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        }
    };
    let form = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Name:    ", label_style(Focus::CommentName)),
            Span::raw(field(Focus::CommentName, format!("commentName{id}"))),
        ]),
        Line::from(vec![
            Span::styled("Message: ", label_style(Focus::CommentMessage)),
            Span::raw(field(Focus::CommentMessage, format!("commentMessage{id}"))),
        ]),
    ])
    .block(
        Block::default()
            .title("Leave a comment (n)")
            .borders(Borders::ALL),
    );
    frame.render_widget(form, rows[1]);
}

fn draw_menu(frame: &mut Frame, page: &App<MemoryDocument>, area: Rect) {
    let targets = page.surface().nav_targets();
    let height = (targets.len() as u16 + 2).min(area.height);
    let menu_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width.min(30),
        height,
    };
    let active = page.surface().active_nav();
    let items: Vec<ListItem> = targets
        .into_iter()
        .map(|target| {
            let style = if active.contains(&target) {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(nav_label(page, target), style))
        })
        .collect();
    frame.render_widget(Clear, menu_area);
    frame.render_widget(
        List::new(items).block(Block::default().title("Menu").borders(Borders::ALL)),
        menu_area,
    );
}

fn draw_notifications(frame: &mut Frame, page: &App<MemoryDocument>) {
    let messages = page.surface().notifications();
    if messages.is_empty() {
        return;
    }
    let screen = frame.size();
    let width = messages
        .iter()
        .map(|message| message.width() as u16 + 4)
        .max()
        .unwrap_or(10)
        .min(screen.width);
    let height = (messages.len() as u16 + 2).min(screen.height);
    let area = Rect {
        x: screen.right().saturating_sub(width),
        y: screen.y,
        width,
        height,
    };
    let lines: Vec<Line> = messages
        .into_iter()
        .map(|message| Line::from(message.to_string()))
        .collect();
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(Color::White).bg(Color::Green))
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn build_status_line(page: &App<MemoryDocument>, view: &ViewState) -> Text<'static> {
    let state = page.state();
    let section = state.router.active().element_id();
    let mut spans = vec![
        Span::raw("Section: "),
        Span::styled(section, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            " | Posts: {}/{}",
            state.listing.len(),
            state.catalog.len()
        )),
    ];
    if let Some(message) = &state.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        ));
    }
    let hints = match view.focus {
        Focus::Browse => "q quit • Tab nav • j/k select • Enter open • / search • c category • n comment • 1-3 share • m menu • Esc home",
        Focus::Search => "Enter search • Esc cancel",
        Focus::CommentName => "Enter/Tab next field • Esc cancel",
        Focus::CommentMessage => "Enter post • Esc cancel",
    };
    Text::from(vec![
        Line::from(spans),
        Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray))),
    ])
}

fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if used + w + 1 > max {
            break;
        }
        out.push_str(grapheme);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::catalog::Catalog;
    use crate::comments::CommentStore;
    use crate::config::AppConfig;
    use crate::storage::MemoryStore;

    fn page() -> App<MemoryDocument> {
        let catalog = Catalog::builtin();
        let doc = MemoryDocument::for_catalog(&catalog);
        let store = CommentStore::new(Arc::new(MemoryStore::new()));
        let mut page = App::new(catalog, store, doc, &AppConfig::default());
        page.initialize();
        page
    }

    fn render(page: &App<MemoryDocument>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).expect("terminal");
        let view = ViewState::default();
        let mut list_state = ListState::default();
        terminal
            .draw(|frame| draw_app(frame, page, &view, &mut list_state))
            .expect("draw");
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn empty_listing_shows_placeholder() {
        let mut page = page();
        page.surface_mut().set_input_value("searchInput", "zzz");
        page.handle_search();
        assert!(render(&page).contains(NO_RESULTS));
    }

    #[test]
    fn post_view_lists_escaped_comments_as_text() {
        let mut page = page();
        page.open_post(1);
        page.surface_mut().set_input_value("commentName1", "<b>x</b>");
        page.surface_mut().set_input_value("commentMessage1", "hello");
        page.submit_comment(1, Instant::now());
        let screen = render(&page);
        assert!(screen.contains("Comments (1)"));
        assert!(screen.contains("<b>x</b>"));
        assert!(screen.contains("Comment posted successfully!"));
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
    }
}
