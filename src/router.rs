use std::fmt;

use crate::catalog::Catalog;

/// Value of the `data-post` attribute that maps a nav control to the home section.
pub const NAV_ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Home,
    Post(u32),
}

impl Section {
    pub fn element_id(self) -> String {
        match self {
            Section::Home => "home".to_string(),
            Section::Post(id) => format!("post{id}"),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.element_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavTarget {
    All,
    Post(u32),
}

impl NavTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == NAV_ALL {
            return Some(NavTarget::All);
        }
        raw.parse().ok().map(NavTarget::Post)
    }

    pub fn data_attr(self) -> String {
        match self {
            NavTarget::All => NAV_ALL.to_string(),
            NavTarget::Post(id) => id.to_string(),
        }
    }

    pub fn section(self) -> Section {
        match self {
            NavTarget::All => Section::Home,
            NavTarget::Post(id) => Section::Post(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Section,
    pub to: Section,
    /// `None` when the section has no matching nav control.
    pub active_nav: Option<NavTarget>,
    pub scroll_to_top: bool,
}

#[derive(Debug, Clone)]
pub struct Router {
    current: Section,
    active_nav: Option<NavTarget>,
    nav_targets: Vec<NavTarget>,
}

impl Router {
    pub fn new(catalog: &Catalog) -> Self {
        let nav_targets = std::iter::once(NavTarget::All)
            .chain(catalog.ids().map(NavTarget::Post))
            .collect();
        Self::with_nav_targets(nav_targets)
    }

    pub fn with_nav_targets(nav_targets: Vec<NavTarget>) -> Self {
        Self {
            current: Section::Home,
            active_nav: Some(NavTarget::All),
            nav_targets,
        }
    }

    pub fn active(&self) -> Section {
        self.current
    }

    pub fn active_nav(&self) -> Option<NavTarget> {
        self.active_nav
    }

    pub fn nav_targets(&self) -> &[NavTarget] {
        &self.nav_targets
    }

    pub fn navigate(&mut self, target: NavTarget) -> Transition {
        self.transition(target.section(), Some(target))
    }

    pub fn open_post(&mut self, post_id: u32) -> Transition {
        let target = NavTarget::Post(post_id);
        let nav = self.nav_targets.contains(&target).then_some(target);
        self.transition(Section::Post(post_id), nav)
    }

    // results live on home, under the `all` control
    pub fn show_results(&mut self) -> Transition {
        self.transition(Section::Home, Some(NavTarget::All))
    }

    fn transition(&mut self, to: Section, active_nav: Option<NavTarget>) -> Transition {
        let from = self.current;
        self.current = to;
        self.active_nav = active_nav;
        tracing::debug!(%from, %to, "section transition");
        Transition {
            from,
            to,
            active_nav,
            scroll_to_top: true,
        }
    }
}
