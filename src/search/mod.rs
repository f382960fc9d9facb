use crate::catalog::{Catalog, Post};

/// Category value that maps back to the unfiltered catalog.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    /// Lower-cased, trimmed substring matched against title, excerpt and category.
    Query(String),
    Category(String),
}

impl Filter {
    pub fn query(input: &str) -> Self {
        let term = input.trim().to_lowercase();
        if term.is_empty() {
            Filter::All
        } else {
            Filter::Query(term)
        }
    }

    pub fn category(input: &str) -> Self {
        if input == ALL_CATEGORIES {
            Filter::All
        } else {
            Filter::Category(input.to_string())
        }
    }

    pub fn is_applied(&self) -> bool {
        !matches!(self, Filter::All)
    }

    pub fn matches(&self, post: &Post) -> bool {
        match self {
            Filter::All => true,
            Filter::Query(term) => {
                post.title.to_lowercase().contains(term.as_str())
                    || post.excerpt.to_lowercase().contains(term.as_str())
                    || post.category.to_lowercase().contains(term.as_str())
            }
            Filter::Category(category) => post.category == *category,
        }
    }

    pub fn highlight_terms(&self) -> Vec<String> {
        match self {
            Filter::Query(term) => vec![term.clone()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    posts: Vec<Post>,
    filtered: bool,
}

impl Listing {
    pub fn unfiltered(catalog: &Catalog) -> Self {
        filter(catalog, &Filter::All)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn ids(&self) -> Vec<u32> {
        self.posts.iter().map(|post| post.id).collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    pub fn shows_placeholder(&self) -> bool {
        self.filtered && self.posts.is_empty()
    }
}

pub fn filter(catalog: &Catalog, predicate: &Filter) -> Listing {
    let posts = catalog
        .posts()
        .iter()
        .filter(|post| predicate.matches(post))
        .cloned()
        .collect();
    Listing {
        posts,
        filtered: predicate.is_applied(),
    }
}
