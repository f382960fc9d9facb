use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

/// Case-insensitive alternation of the search terms, longest first so that
/// overlapping terms highlight the widest match.
pub fn term_regex(terms: &[String]) -> Option<Regex> {
    let mut seen = HashSet::new();
    let mut unique: Vec<&str> = terms
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty() && seen.insert(term.to_lowercase()))
        .collect();
    if unique.is_empty() {
        return None;
    }
    unique.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = unique
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// A run of text, flagged when it matched a search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub matched: bool,
}

pub fn segments<'a>(text: &'a str, regex: Option<&Regex>) -> Vec<Segment<'a>> {
    let Some(re) = regex else {
        return vec![Segment {
            text,
            matched: false,
        }];
    };
    let mut out = Vec::new();
    let mut last = 0;
    for mat in re.find_iter(text) {
        if mat.start() > last {
            out.push(Segment {
                text: &text[last..mat.start()],
                matched: false,
            });
        }
        out.push(Segment {
            text: mat.as_str(),
            matched: true,
        });
        last = mat.end();
    }
    if last < text.len() || out.is_empty() {
        out.push(Segment {
            text: &text[last..],
            matched: false,
        });
    }
    out
}
