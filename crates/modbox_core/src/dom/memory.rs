//! In-memory document implementing [`DomAdapter`].
//!
//! # Responsibility
//! - Back the registry in headless runs (CLI, tests) without a browser.
//! - Record bound handlers so DOM events can be dispatched synchronously.
//!
//! # Invariants
//! - The document always contains `html > body`.
//! - Query results are in document order and contain no duplicates.
//! - Unsupported selectors match nothing.

use crate::dom::selector::{parse_selector, Selector};
use crate::dom::{Attributes, DomAdapter, DomEvent, DomHandler, ElementHandle};
use log::warn;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        styles: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
}

struct Listener {
    element: ElementHandle,
    event_type: String,
    handler: DomHandler,
}

#[derive(Default)]
struct DocumentState {
    nodes: Vec<Node>,
    listeners: Vec<Listener>,
}

/// Headless document tree.
pub struct MemoryDocument {
    state: RefCell<DocumentState>,
}

const ROOT_INDEX: usize = 0;
const BODY_INDEX: usize = 1;

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Creates an empty `html > body` document.
    pub fn new() -> Self {
        let mut state = DocumentState::default();
        state.nodes.push(Node {
            kind: element_kind("html"),
            parent: None,
            children: vec![BODY_INDEX],
        });
        state.nodes.push(Node {
            kind: element_kind("body"),
            parent: Some(ROOT_INDEX),
            children: Vec::new(),
        });
        Self {
            state: RefCell::new(state),
        }
    }

    /// Creates and appends one element under `parent` in a single call.
    pub fn insert_element(
        &self,
        parent: ElementHandle,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> ElementHandle {
        let element = self.create_element(tag);
        let attributes: Attributes = attributes
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.apply_attributes(element, &attributes);
        self.append_child(parent, element);
        element
    }

    /// Invokes handlers bound to `element` for `event_type`, in bind order.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, element: ElementHandle, event_type: &str) -> usize {
        let handlers: Vec<DomHandler> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.element == element && listener.event_type == event_type)
            .map(|listener| Rc::clone(&listener.handler))
            .collect();
        let event = DomEvent {
            event_type: event_type.to_string(),
            target: element,
        };
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    /// Number of handlers currently bound to `element` for `event_type`.
    pub fn listener_count(&self, element: ElementHandle, event_type: &str) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.element == element && listener.event_type == event_type)
            .count()
    }

    pub fn tag_name(&self, element: ElementHandle) -> Option<String> {
        let state = self.state.borrow();
        match &state.nodes.get(index_of(element))?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn children(&self, element: ElementHandle) -> Vec<ElementHandle> {
        let state = self.state.borrow();
        state
            .nodes
            .get(index_of(element))
            .map(|node| node.children.iter().map(|index| handle_of(*index)).collect())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, element: ElementHandle) -> Option<ElementHandle> {
        let state = self.state.borrow();
        state.nodes.get(index_of(element))?.parent.map(handle_of)
    }

    /// Concatenated text of `element` and its descendants.
    pub fn text_content(&self, element: ElementHandle) -> String {
        let state = self.state.borrow();
        let mut text = String::new();
        collect_text(&state.nodes, index_of(element), &mut text);
        text
    }

    pub fn style(&self, element: ElementHandle, property: &str) -> Option<String> {
        let state = self.state.borrow();
        match &state.nodes.get(index_of(element))?.kind {
            NodeKind::Element { styles, .. } => styles.get(property).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    fn query_parsed(
        &self,
        selector: &Selector,
        context: Option<ElementHandle>,
    ) -> Vec<ElementHandle> {
        let state = self.state.borrow();
        let scope = context.map(index_of).unwrap_or(ROOT_INDEX);
        if scope >= state.nodes.len() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        if context.is_none() {
            candidates.push(ROOT_INDEX);
        }
        collect_descendants(&state.nodes, scope, &mut candidates);

        candidates
            .into_iter()
            .filter(|index| matches_selector(&state.nodes, *index, selector))
            .map(handle_of)
            .collect()
    }
}

impl DomAdapter for MemoryDocument {
    fn query(&self, selector: &str, context: Option<ElementHandle>) -> Vec<ElementHandle> {
        match parse_selector(selector) {
            Ok(parsed) => self.query_parsed(&parsed, context),
            Err(err) => {
                warn!("event=dom_query module=dom status=error reason={err}");
                Vec::new()
            }
        }
    }

    fn element_by_id(&self, id: &str) -> Option<ElementHandle> {
        let state = self.state.borrow();
        let mut ordered = vec![ROOT_INDEX];
        collect_descendants(&state.nodes, ROOT_INDEX, &mut ordered);
        ordered
            .into_iter()
            .find(|index| attribute_of(&state.nodes[*index], "id") == Some(id))
            .map(handle_of)
    }

    fn body(&self) -> Option<ElementHandle> {
        Some(handle_of(BODY_INDEX))
    }

    fn bind(&self, element: ElementHandle, event_type: &str, handler: DomHandler) {
        self.state.borrow_mut().listeners.push(Listener {
            element,
            event_type: event_type.to_string(),
            handler,
        });
    }

    fn unbind(&self, element: ElementHandle, event_type: &str, handler: &DomHandler) {
        self.state.borrow_mut().listeners.retain(|listener| {
            !(listener.element == element
                && listener.event_type == event_type
                && Rc::ptr_eq(&listener.handler, handler))
        });
    }

    fn create_element(&self, tag: &str) -> ElementHandle {
        self.push_detached(element_kind(tag))
    }

    fn create_text_node(&self, text: &str) -> ElementHandle {
        self.push_detached(NodeKind::Text(text.to_string()))
    }

    fn append_child(&self, parent: ElementHandle, child: ElementHandle) {
        let parent_index = index_of(parent);
        let child_index = index_of(child);
        let mut state = self.state.borrow_mut();
        let len = state.nodes.len();
        if parent_index >= len || child_index >= len || parent_index == child_index {
            return;
        }
        if matches!(state.nodes[parent_index].kind, NodeKind::Text(_)) {
            return;
        }
        if is_ancestor(&state.nodes, child_index, parent_index) {
            return;
        }
        if let Some(previous) = state.nodes[child_index].parent {
            state.nodes[previous]
                .children
                .retain(|index| *index != child_index);
        }
        state.nodes[child_index].parent = Some(parent_index);
        state.nodes[parent_index].children.push(child_index);
    }

    fn apply_attributes(&self, element: ElementHandle, attributes: &Attributes) {
        let mut state = self.state.borrow_mut();
        if let Some(Node {
            kind: NodeKind::Element {
                attributes: current,
                ..
            },
            ..
        }) = state.nodes.get_mut(index_of(element))
        {
            for (name, value) in attributes {
                current.insert(name.clone(), value.clone());
            }
        }
    }

    fn attribute(&self, element: ElementHandle, name: &str) -> Option<String> {
        let state = self.state.borrow();
        attribute_of(state.nodes.get(index_of(element))?, name).map(str::to_string)
    }

    fn set_style(&self, element: ElementHandle, property: &str, value: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(Node {
            kind: NodeKind::Element { styles, .. },
            ..
        }) = state.nodes.get_mut(index_of(element))
        {
            styles.insert(property.to_string(), value.to_string());
        }
    }
}

impl MemoryDocument {
    fn push_detached(&self, kind: NodeKind) -> ElementHandle {
        let mut state = self.state.borrow_mut();
        state.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        handle_of(state.nodes.len() - 1)
    }
}

fn element_kind(tag: &str) -> NodeKind {
    NodeKind::Element {
        tag: tag.to_ascii_lowercase(),
        attributes: BTreeMap::new(),
        styles: BTreeMap::new(),
    }
}

fn index_of(handle: ElementHandle) -> usize {
    usize::try_from(handle.raw()).unwrap_or(usize::MAX)
}

fn handle_of(index: usize) -> ElementHandle {
    ElementHandle::from_raw(index as u64)
}

fn attribute_of<'a>(node: &'a Node, name: &str) -> Option<&'a str> {
    match &node.kind {
        NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
        NodeKind::Text(_) => None,
    }
}

fn collect_descendants(nodes: &[Node], index: usize, out: &mut Vec<usize>) {
    for child in &nodes[index].children {
        out.push(*child);
        collect_descendants(nodes, *child, out);
    }
}

fn collect_text(nodes: &[Node], index: usize, out: &mut String) {
    let Some(node) = nodes.get(index) else {
        return;
    };
    match &node.kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Element { .. } => {
            for child in &node.children {
                collect_text(nodes, *child, out);
            }
        }
    }
}

fn is_ancestor(nodes: &[Node], candidate: usize, of: usize) -> bool {
    let mut current = nodes[of].parent;
    while let Some(index) = current {
        if index == candidate {
            return true;
        }
        current = nodes[index].parent;
    }
    false
}

fn matches_compound(node: &Node, compound: &crate::dom::selector::Compound) -> bool {
    match &node.kind {
        NodeKind::Element {
            tag, attributes, ..
        } => compound.matches(
            tag,
            attributes.get("id").map(String::as_str),
            attributes.get("class").map(String::as_str),
        ),
        NodeKind::Text(_) => false,
    }
}

fn matches_selector(nodes: &[Node], index: usize, selector: &Selector) -> bool {
    let Some((last, ancestors)) = selector.parts.split_last() else {
        return false;
    };
    if !matches_compound(&nodes[index], last) {
        return false;
    }

    let mut current = nodes[index].parent;
    for compound in ancestors.iter().rev() {
        loop {
            let Some(ancestor) = current else {
                return false;
            };
            current = nodes[ancestor].parent;
            if matches_compound(&nodes[ancestor], compound) {
                break;
            }
        }
    }
    true
}
