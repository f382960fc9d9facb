//! Declarative event wiring.
//!
//! Every interaction the page reacts to is one row of the [`BindingTable`],
//! attached once at the document root. Events carry the propagation path from
//! the target element outwards and are matched against the table by
//! delegation, so re-rendering markup never adds or drops handlers.

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Submit,
    Keypress,
    Change,
    Resize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: IndexMap<String, String>,
}

impl Target {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    /// Target first, then its ancestors. Empty for window events.
    pub path: Vec<Target>,
    pub key: Option<String>,
}

impl DomEvent {
    pub fn new(kind: EventKind, path: Vec<Target>) -> Self {
        Self {
            kind,
            path,
            key: None,
        }
    }

    pub fn click(path: Vec<Target>) -> Self {
        Self::new(EventKind::Click, path)
    }

    pub fn submit(form: Target) -> Self {
        Self::new(EventKind::Submit, vec![form])
    }

    pub fn keypress(target: Target, key: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Keypress,
            path: vec![target],
            key: Some(key.into()),
        }
    }

    pub fn change(target: Target) -> Self {
        Self::new(EventKind::Change, vec![target])
    }

    pub fn resize() -> Self {
        Self::new(EventKind::Resize, Vec::new())
    }

    pub fn target(&self) -> Option<&Target> {
        self.path.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Id(&'static str),
    IdPrefix(&'static str),
    Class(&'static str),
    /// The event target itself is an `<a>` whose `href` starts with `#`.
    AnchorHash,
    Window,
}

impl Selector {
    fn matches(self, target: &Target) -> bool {
        match self {
            Selector::Id(id) => target.id.as_deref() == Some(id),
            Selector::IdPrefix(prefix) => target
                .id
                .as_deref()
                .and_then(|id| id.strip_prefix(prefix))
                .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())),
            Selector::Class(class) => target.has_class(class),
            Selector::AnchorHash => {
                target.tag == "a" && target.attr("href").is_some_and(|href| href.starts_with('#'))
            }
            Selector::Window => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Navigate,
    ToggleMenu,
    Search,
    SearchKey,
    CategoryChange,
    OpenPost,
    SubmitComment,
    Share,
    Resize,
    AnchorScroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub event: EventKind,
    pub selector: Selector,
    pub handler: HandlerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matched<'e> {
    pub handler: HandlerKind,
    pub element: Option<&'e Target>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn standard() -> Self {
        use EventKind::*;
        use HandlerKind as H;
        let row = |event, selector, handler| Binding {
            event,
            selector,
            handler,
        };
        Self::new(vec![
            row(Click, Selector::Class("nav-link"), H::Navigate),
            row(Click, Selector::Id("mobileToggle"), H::ToggleMenu),
            row(Click, Selector::Id("searchBtn"), H::Search),
            row(Keypress, Selector::Id("searchInput"), H::SearchKey),
            row(Change, Selector::Id("categoryFilter"), H::CategoryChange),
            row(Click, Selector::Class("post-card"), H::OpenPost),
            row(Submit, Selector::IdPrefix("commentForm"), H::SubmitComment),
            row(Click, Selector::Class("share-btn"), H::Share),
            row(Resize, Selector::Window, H::Resize),
            row(Click, Selector::AnchorHash, H::AnchorScroll),
        ])
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Rows that fire for `event`, in table order. Each row matches the
    /// closest element on the path, except anchor rows which only look at
    /// the target itself.
    pub fn resolve<'e>(&self, event: &'e DomEvent) -> Vec<Matched<'e>> {
        self.bindings
            .iter()
            .filter(|binding| binding.event == event.kind)
            .filter_map(|binding| match binding.selector {
                Selector::Window => event.path.is_empty().then_some(Matched {
                    handler: binding.handler,
                    element: None,
                }),
                Selector::AnchorHash => event
                    .target()
                    .filter(|target| binding.selector.matches(target))
                    .map(|target| Matched {
                        handler: binding.handler,
                        element: Some(target),
                    }),
                selector => event
                    .path
                    .iter()
                    .find(|target| selector.matches(target))
                    .map(|target| Matched {
                        handler: binding.handler,
                        element: Some(target),
                    }),
            })
            .collect()
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::standard()
    }
}
