use indexmap::IndexMap;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::render;
use crate::router::{NavTarget, Section};
use crate::search::ALL_CATEGORIES;

/// The rendering surface the page logic drives.
///
/// Every method that addresses an element by id reports whether the element
/// exists; a missing element is never an error and callers simply move on.
pub trait Surface {
    fn has_element(&self, id: &str) -> bool;

    /// Ids of every content section, in document order.
    fn section_ids(&self) -> Vec<String>;
    fn set_section_visible(&mut self, id: &str, visible: bool) -> bool;

    fn nav_targets(&self) -> Vec<NavTarget>;
    fn set_nav_active(&mut self, target: NavTarget, active: bool) -> bool;

    fn menu_open(&self) -> bool;
    fn set_menu_open(&mut self, open: bool);

    fn set_inner_html(&mut self, id: &str, markup: &str) -> bool;
    fn append_html(&mut self, id: &str, markup: &str) -> bool;
    fn set_text(&mut self, id: &str, text: &str) -> bool;

    fn input_value(&self, id: &str) -> Option<String>;
    fn set_input_value(&mut self, id: &str, value: &str) -> bool;

    fn scroll_to_top(&mut self);
    fn scroll_into_view(&mut self, id: &str) -> bool;

    /// Blocking notice.
    fn alert(&mut self, message: &str);
    fn open_window(&mut self, url: &str, target: &str, features: &str);

    fn show_notification(&mut self, id: Uuid, message: &str);
    fn remove_notification(&mut self, id: Uuid) -> bool;

    fn viewport_width(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Section,
    Container,
    Input,
    Button,
    Form,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub active: bool,
    pub inner_html: String,
    pub value: String,
}

impl Element {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            active: false,
            inner_html: String::new(),
            value: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedWindow {
    pub url: String,
    pub target: String,
    pub features: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scroll {
    Top,
    IntoView,
}

/// Headless document holding the page's addressable elements.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    elements: IndexMap<String, Element>,
    nav: IndexMap<NavTarget, bool>,
    menu_open: bool,
    alerts: Vec<String>,
    windows: Vec<OpenedWindow>,
    notifications: IndexMap<Uuid, String>,
    scrolls: Vec<(Scroll, Option<String>)>,
    viewport_width: u32,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self {
            elements: IndexMap::new(),
            nav: IndexMap::new(),
            menu_open: false,
            alerts: Vec::new(),
            windows: Vec::new(),
            notifications: IndexMap::new(),
            scrolls: Vec::new(),
            viewport_width: 1024,
        }
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element layout of the blog page for `catalog`, before any script runs.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        let mut doc = Self::new();
        doc.nav.insert(NavTarget::All, false);
        doc.insert(Section::Home.element_id(), ElementKind::Section);
        doc.insert("postsGrid", ElementKind::Container);
        doc.insert("searchInput", ElementKind::Input);
        doc.insert("searchBtn", ElementKind::Button);
        doc.insert("categoryFilter", ElementKind::Input);
        doc.insert("mobileToggle", ElementKind::Button);
        doc.set_input_value("categoryFilter", ALL_CATEGORIES);
        for id in catalog.ids() {
            doc.nav.insert(NavTarget::Post(id), false);
            doc.insert(Section::Post(id).element_id(), ElementKind::Section);
            doc.insert(format!("commentForm{id}"), ElementKind::Form);
            doc.insert(format!("commentName{id}"), ElementKind::Input);
            doc.insert(format!("commentMessage{id}"), ElementKind::Input);
            doc.insert(format!("commentsList{id}"), ElementKind::Container);
            doc.insert(format!("commentCount{id}"), ElementKind::Container);
            doc.set_text(&format!("commentCount{id}"), "0");
        }
        doc
    }

    pub fn insert(&mut self, id: impl Into<String>, kind: ElementKind) {
        self.elements.insert(id.into(), Element::new(kind));
    }

    pub fn remove_element(&mut self, id: &str) -> Option<Element> {
        self.elements.shift_remove(id)
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn inner_html(&self, id: &str) -> Option<&str> {
        self.elements.get(id).map(|el| el.inner_html.as_str())
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.inner_html(id).map(render::text_content)
    }

    pub fn visible_sections(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|(_, el)| el.kind == ElementKind::Section && el.active)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn active_nav(&self) -> Vec<NavTarget> {
        self.nav
            .iter()
            .filter(|(_, active)| **active)
            .map(|(target, _)| *target)
            .collect()
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    pub fn windows(&self) -> &[OpenedWindow] {
        &self.windows
    }

    pub fn notifications(&self) -> Vec<&str> {
        self.notifications.values().map(String::as_str).collect()
    }

    pub fn scrolls(&self) -> &[(Scroll, Option<String>)] {
        &self.scrolls
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }
}

impl Surface for MemoryDocument {
    fn has_element(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn section_ids(&self) -> Vec<String> {
        self.elements
            .iter()
            .filter(|(_, el)| el.kind == ElementKind::Section)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn set_section_visible(&mut self, id: &str, visible: bool) -> bool {
        match self.elements.get_mut(id) {
            Some(el) if el.kind == ElementKind::Section => {
                el.active = visible;
                true
            }
            _ => false,
        }
    }

    fn nav_targets(&self) -> Vec<NavTarget> {
        self.nav.keys().copied().collect()
    }

    fn set_nav_active(&mut self, target: NavTarget, active: bool) -> bool {
        match self.nav.get_mut(&target) {
            Some(flag) => {
                *flag = active;
                true
            }
            None => false,
        }
    }

    fn menu_open(&self) -> bool {
        self.menu_open
    }

    fn set_menu_open(&mut self, open: bool) {
        self.menu_open = open;
    }

    fn set_inner_html(&mut self, id: &str, markup: &str) -> bool {
        match self.elements.get_mut(id) {
            Some(el) => {
                el.inner_html = markup.to_string();
                true
            }
            None => false,
        }
    }

    fn append_html(&mut self, id: &str, markup: &str) -> bool {
        match self.elements.get_mut(id) {
            Some(el) => {
                el.inner_html.push_str(markup);
                true
            }
            None => false,
        }
    }

    fn set_text(&mut self, id: &str, text: &str) -> bool {
        self.set_inner_html(id, &render::escape_text(text))
    }

    fn input_value(&self, id: &str) -> Option<String> {
        self.elements.get(id).map(|el| el.value.clone())
    }

    fn set_input_value(&mut self, id: &str, value: &str) -> bool {
        match self.elements.get_mut(id) {
            Some(el) => {
                el.value = value.to_string();
                true
            }
            None => false,
        }
    }

    fn scroll_to_top(&mut self) {
        self.scrolls.push((Scroll::Top, None));
    }

    fn scroll_into_view(&mut self, id: &str) -> bool {
        if !self.elements.contains_key(id) {
            return false;
        }
        self.scrolls.push((Scroll::IntoView, Some(id.to_string())));
        true
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn open_window(&mut self, url: &str, target: &str, features: &str) {
        self.windows.push(OpenedWindow {
            url: url.to_string(),
            target: target.to_string(),
            features: features.to_string(),
        });
    }

    fn show_notification(&mut self, id: Uuid, message: &str) {
        self.notifications.insert(id, message.to_string());
    }

    fn remove_notification(&mut self, id: Uuid) -> bool {
        self.notifications.shift_remove(&id).is_some()
    }

    fn viewport_width(&self) -> u32 {
        self.viewport_width
    }
}
