//! Per-module capability facade.
//!
//! # Responsibility
//! - Give one module a narrowed view of the document, the event bus and
//!   request transport, scoped to its own container element.
//!
//! # Invariants
//! - The container is resolved once, with a `#<module id>` query, when the
//!   sandbox is built; it is never re-resolved.
//! - A sandbox only holds a weak registry handle, so modules capturing their
//!   sandbox do not keep the registry alive.

pub mod transport;

use crate::dom::class_list;
use crate::dom::{Attributes, DomAdapter, DomBinding, ElementHandle, Selection};
use crate::module::events::{Event, EventTable};
use crate::module::registry::{ModuleRegistry, RegistryError, WeakRegistry};
use log::debug;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use transport::{Connection, HttpMethod, Transport};
use uuid::Uuid;

/// Class toggled by drag-and-drop widgets once an element is in place.
pub const IN_PLACE_CLASS: &str = "ui-inplace";

const CLASS_ATTRIBUTE: &str = "class";

/// Sandbox operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxError {
    MissingContainer(String),
    EmptyEventType,
    UnsupportedMode(String),
    MissingHref,
    RegistryDropped,
    Registry(RegistryError),
}

impl Display for SandboxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContainer(value) => {
                write!(f, "module container does not exist: #{value}")
            }
            Self::EmptyEventType => write!(f, "dom event type must not be empty"),
            Self::UnsupportedMode(value) => {
                write!(f, "connection mode is unsupported: `{value}` (expected get|post)")
            }
            Self::MissingHref => write!(f, "connection href must not be empty"),
            Self::RegistryDropped => write!(f, "module registry is no longer alive"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SandboxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for SandboxError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

/// Declarative input for [`Sandbox::create_element`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementConfig {
    /// Appended in order before any text.
    pub children: Vec<ElementHandle>,
    /// Appended as one text node when non-empty.
    pub text: Option<String>,
    /// Applied last.
    pub attributes: Attributes,
}

impl ElementConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(mut self, child: ElementHandle) -> Self {
        self.children.push(child);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Capability object handed to one module factory invocation.
#[derive(Clone)]
pub struct Sandbox {
    id: Uuid,
    module_id: String,
    registry: WeakRegistry,
    dom: Rc<dyn DomAdapter>,
    transport: Rc<dyn Transport>,
    container: Option<ElementHandle>,
}

impl Sandbox {
    /// Builds a sandbox for `module_id`, resolving its container once.
    pub fn new(registry: &ModuleRegistry, module_id: &str) -> Self {
        let dom = registry.dom();
        let container = dom.query(&format!("#{module_id}"), None).first().copied();
        let id = Uuid::new_v4();
        debug!(
            "event=sandbox_open module=sandbox status=ok id={module_id} sandbox_id={id} container={}",
            container.is_some()
        );
        Self {
            id,
            module_id: module_id.to_string(),
            registry: registry.downgrade(),
            dom,
            transport: registry.transport(),
            container,
        }
    }

    /// Unique id of this sandbox instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// The module's container element.
    pub fn parent(&self) -> Option<ElementHandle> {
        self.container
    }

    /// The module's container element, or `MissingContainer`.
    pub fn require_parent(&self) -> Result<ElementHandle, SandboxError> {
        self.container
            .ok_or_else(|| SandboxError::MissingContainer(self.module_id.clone()))
    }

    /// Queries descendants of the container.
    ///
    /// Returns an empty selection when the container is absent.
    pub fn find(&self, selector: &str) -> Selection {
        match self.container {
            Some(container) => Selection::within(Rc::clone(&self.dom), selector, container),
            None => Selection::empty(Rc::clone(&self.dom)),
        }
    }

    /// Binds a DOM handler; a bare handler binds to `click`.
    pub fn add_event(
        &self,
        element: ElementHandle,
        binding: impl Into<DomBinding>,
    ) -> Result<(), SandboxError> {
        let binding = require_event_type(binding.into())?;
        self.dom
            .bind(element, &binding.event_type, binding.handler);
        Ok(())
    }

    /// Unbinds a DOM handler; a bare handler unbinds from `click`.
    pub fn remove_event(
        &self,
        element: ElementHandle,
        binding: impl Into<DomBinding>,
    ) -> Result<(), SandboxError> {
        let binding = require_event_type(binding.into())?;
        self.dom
            .unbind(element, &binding.event_type, &binding.handler);
        Ok(())
    }

    /// Publishes `event` to every listening module.
    ///
    /// Malformed events are rejected without a diagnostic report.
    pub fn notify(&self, event: &Event) -> Result<usize, SandboxError> {
        if !event.is_well_formed() {
            return Err(SandboxError::Registry(RegistryError::MalformedEvent));
        }
        Ok(self.registry()?.trigger_event(event)?)
    }

    /// Replaces this module's event table.
    pub fn listen(&self, table: EventTable) -> Result<(), SandboxError> {
        Ok(self.registry()?.register_events(table, &self.module_id)?)
    }

    /// Drops this module's whole event table.
    pub fn ignore(&self) -> Result<(), SandboxError> {
        Ok(self.registry()?.remove_events(&self.module_id)?)
    }

    pub fn has_class(&self, element: ElementHandle, class: &str) -> bool {
        class_list::has_class(&self.class_attr(element), class)
    }

    pub fn add_class(&self, element: ElementHandle, class: &str) {
        let current = self.class_attr(element);
        let updated = class_list::add_class(&current, class);
        if updated != current {
            self.set_class_attr(element, updated);
        }
    }

    pub fn remove_class(&self, element: ElementHandle, class: &str) {
        let current = self.class_attr(element);
        let updated = class_list::remove_class(&current, class);
        if updated != current {
            self.set_class_attr(element, updated);
        }
    }

    /// Returns a dragged element to its resting place.
    ///
    /// An element marked in place only loses the marker class; anything else
    /// is moved back to the container origin.
    pub fn drag_return(&self, element: ElementHandle) {
        if self.has_class(element, IN_PLACE_CLASS) {
            self.remove_class(element, IN_PLACE_CLASS);
        } else {
            self.dom.set_style(element, "top", "0");
            self.dom.set_style(element, "left", "0");
        }
    }

    /// Opens (but does not send) a `get` or `post` connection.
    pub fn open_connection(
        &self,
        mode: &str,
        href: &str,
    ) -> Result<Box<dyn Connection>, SandboxError> {
        if href.trim().is_empty() {
            return Err(self.report(SandboxError::MissingHref));
        }
        let Some(method) = HttpMethod::parse(mode) else {
            return Err(self.report(SandboxError::UnsupportedMode(mode.to_string())));
        };
        Ok(self.transport.open(method, href))
    }

    /// Builds one element: children first, then text, then attributes.
    pub fn create_element(&self, tag: &str, config: ElementConfig) -> ElementHandle {
        let element = self.dom.create_element(tag);
        for child in config.children {
            self.dom.append_child(element, child);
        }
        if let Some(text) = config.text.filter(|text| !text.is_empty()) {
            let node = self.dom.create_text_node(&text);
            self.dom.append_child(element, node);
        }
        if !config.attributes.is_empty() {
            self.dom.apply_attributes(element, &config.attributes);
        }
        element
    }

    /// Values that occur more than once in `values`, once each, sorted.
    pub fn array_return_doubles<T: Ord + Clone>(&self, values: &[T]) -> Vec<T> {
        array_return_doubles(values)
    }

    fn registry(&self) -> Result<ModuleRegistry, SandboxError> {
        self.registry.upgrade().ok_or(SandboxError::RegistryDropped)
    }

    fn report(&self, err: SandboxError) -> SandboxError {
        if let Some(registry) = self.registry.upgrade() {
            registry.log(
                1,
                &format!(
                    "event=open_connection module=sandbox status=error id={} reason={err}",
                    self.module_id
                ),
            );
        }
        err
    }

    fn class_attr(&self, element: ElementHandle) -> String {
        self.dom
            .attribute(element, CLASS_ATTRIBUTE)
            .unwrap_or_default()
    }

    fn set_class_attr(&self, element: ElementHandle, value: String) {
        let mut attributes = Attributes::new();
        attributes.insert(CLASS_ATTRIBUTE.to_string(), value);
        self.dom.apply_attributes(element, &attributes);
    }
}

impl Debug for Sandbox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("id", &self.id)
            .field("module_id", &self.module_id)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// Values that occur more than once in `values`, once each, sorted.
///
/// The input slice is left untouched.
pub fn array_return_doubles<T: Ord + Clone>(values: &[T]) -> Vec<T> {
    let mut sorted = values.to_vec();
    sorted.sort();
    let mut doubles: Vec<T> = Vec::new();
    for pair in sorted.windows(2) {
        if pair[0] == pair[1] && doubles.last() != Some(&pair[0]) {
            doubles.push(pair[0].clone());
        }
    }
    doubles
}

fn require_event_type(binding: DomBinding) -> Result<DomBinding, SandboxError> {
    if binding.event_type.trim().is_empty() {
        return Err(SandboxError::EmptyEventType);
    }
    Ok(binding)
}

#[cfg(test)]
mod tests {
    use super::array_return_doubles;

    #[test]
    fn returns_each_double_once_in_sorted_order() {
        assert_eq!(array_return_doubles(&[3, 1, 3, 2, 1, 3]), vec![1, 3]);
        assert!(array_return_doubles(&["a", "b"]).is_empty());
        assert!(array_return_doubles::<u8>(&[]).is_empty());
    }

    #[test]
    fn leaves_input_untouched() {
        let values = vec!["b", "a", "b"];
        let doubles = array_return_doubles(&values);
        assert_eq!(doubles, vec!["b"]);
        assert_eq!(values, vec!["b", "a", "b"]);
    }
}
