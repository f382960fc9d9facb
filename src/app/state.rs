use unicode_segmentation::UnicodeSegmentation;

use crate::catalog::Catalog;
use crate::router::Router;
use crate::search::{self, Filter, Listing};

#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub router: Router,
    pub filter: Filter,
    pub listing: Listing,
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(catalog: Catalog) -> Self {
        let router = Router::new(&catalog);
        let listing = Listing::unfiltered(&catalog);
        Self {
            catalog,
            router,
            filter: Filter::All,
            listing,
            status_message: None,
        }
    }

    pub fn apply_filter(&mut self, filter: Filter) -> &Listing {
        self.listing = search::filter(&self.catalog, &filter);
        tracing::debug!(?filter, matches = self.listing.len(), "listing filtered");
        self.filter = filter;
        &self.listing
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Browse,
    Search,
    CommentName,
    CommentMessage,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub focus: Focus,
    pub selected: usize,
    /// The field being edited; mirrored into the page input on every change.
    pub input: InputField,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            focus: Focus::Browse,
            selected: 0,
            input: InputField::default(),
        }
    }
}

impl ViewState {
    pub fn is_editing(&self) -> bool {
        self.focus != Focus::Browse
    }

    pub fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        let max = len as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, max) as usize;
    }
}

/// Single-line text input with a grapheme-aware cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputField {
    buffer: String,
    cursor: usize,
}

impl InputField {
    pub fn with_text(text: &str) -> Self {
        Self {
            buffer: text.to_string(),
            cursor: text.len(),
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut scratch = [0u8; 4];
        let encoded = ch.encode_utf8(&mut scratch);
        self.buffer.insert_str(self.cursor, encoded);
        self.cursor += encoded.len();
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        self.cursor = next_grapheme_boundary(&self.buffer, self.cursor);
        true
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|grapheme| cursor + grapheme.len())
        .unwrap_or(text.len())
}
