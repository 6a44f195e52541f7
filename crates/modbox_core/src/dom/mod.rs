//! DOM adapter contract used by the registry, sandbox and loader.
//!
//! # Responsibility
//! - Define the minimal document capability set the core delegates to.
//! - Keep the concrete DOM/selection library swappable behind one trait.
//!
//! # Invariants
//! - Element handles are opaque and only meaningful to the adapter that
//!   issued them.
//! - Handler identity for `unbind` is `Rc` pointer identity.

pub mod class_list;
pub mod memory;
pub mod selector;

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Opaque node handle issued by a [`DomAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Event payload delivered to DOM handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub event_type: String,
    pub target: ElementHandle,
}

/// DOM event callback.
pub type DomHandler = Rc<dyn Fn(&DomEvent)>;

/// Attribute set applied with [`DomAdapter::apply_attributes`].
pub type Attributes = BTreeMap<String, String>;

/// Event type used when a binding only carries a handler.
pub const DEFAULT_DOM_EVENT: &str = "click";

/// Event type + handler pair for bind/unbind calls.
///
/// Converting a bare [`DomHandler`] defaults the event type to `click`.
#[derive(Clone)]
pub struct DomBinding {
    pub event_type: String,
    pub handler: DomHandler,
}

impl DomBinding {
    pub fn new(event_type: impl Into<String>, handler: DomHandler) -> Self {
        Self {
            event_type: event_type.into(),
            handler,
        }
    }
}

impl From<DomHandler> for DomBinding {
    fn from(handler: DomHandler) -> Self {
        Self::new(DEFAULT_DOM_EVENT, handler)
    }
}

impl From<(&str, DomHandler)> for DomBinding {
    fn from((event_type, handler): (&str, DomHandler)) -> Self {
        Self::new(event_type, handler)
    }
}

impl Debug for DomBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomBinding")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

/// Document capability set the core delegates to.
///
/// Any library satisfying this contract can back the registry.
pub trait DomAdapter {
    /// Queries elements by selector, scoped to descendants of `context` when set.
    fn query(&self, selector: &str, context: Option<ElementHandle>) -> Vec<ElementHandle>;
    fn element_by_id(&self, id: &str) -> Option<ElementHandle>;
    fn body(&self) -> Option<ElementHandle>;
    fn bind(&self, element: ElementHandle, event_type: &str, handler: DomHandler);
    fn unbind(&self, element: ElementHandle, event_type: &str, handler: &DomHandler);
    fn create_element(&self, tag: &str) -> ElementHandle;
    fn create_text_node(&self, text: &str) -> ElementHandle;
    fn append_child(&self, parent: ElementHandle, child: ElementHandle);
    fn apply_attributes(&self, element: ElementHandle, attributes: &Attributes);
    fn attribute(&self, element: ElementHandle, name: &str) -> Option<String>;
    fn set_style(&self, element: ElementHandle, property: &str, value: &str);
}

/// Query result that can be narrowed with further scoped queries.
#[derive(Clone)]
pub struct Selection {
    dom: Rc<dyn DomAdapter>,
    elements: Vec<ElementHandle>,
}

impl Selection {
    /// Runs `selector` against the whole document.
    pub fn select(dom: Rc<dyn DomAdapter>, selector: &str) -> Self {
        let elements = dom.query(selector, None);
        Self { dom, elements }
    }

    /// Runs `selector` against descendants of `context`.
    pub fn within(dom: Rc<dyn DomAdapter>, selector: &str, context: ElementHandle) -> Self {
        let elements = dom.query(selector, Some(context));
        Self { dom, elements }
    }

    pub fn empty(dom: Rc<dyn DomAdapter>) -> Self {
        Self {
            dom,
            elements: Vec::new(),
        }
    }

    /// Searches descendants of every element in this selection.
    pub fn query(&self, selector: &str) -> Selection {
        let mut found = Vec::new();
        for element in &self.elements {
            for hit in self.dom.query(selector, Some(*element)) {
                if !found.contains(&hit) {
                    found.push(hit);
                }
            }
        }
        Self {
            dom: Rc::clone(&self.dom),
            elements: found,
        }
    }

    pub fn first(&self) -> Option<ElementHandle> {
        self.elements.first().copied()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ElementHandle> + '_ {
        self.elements.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<ElementHandle> {
        self.elements.clone()
    }
}

impl Debug for Selection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("elements", &self.elements)
            .finish_non_exhaustive()
    }
}
