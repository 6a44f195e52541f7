//! Inter-module events and the per-type route index.
//!
//! # Invariants
//! - Each module owns at most one event table; replacing it drops every
//!   route the previous table contributed.
//! - Routes for one event type keep registration order.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Handler invoked with the event payload.
pub type EventHandler = Rc<dyn Fn(&Value)>;

/// Event type name -> handler, as registered by one module.
pub type EventTable = BTreeMap<String, EventHandler>;

/// Transient message published by a module.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub data: Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Event without payload (`null` data).
    pub fn signal(event_type: impl Into<String>) -> Self {
        Self::new(event_type, Value::Null)
    }

    pub fn is_well_formed(&self) -> bool {
        !self.event_type.trim().is_empty()
    }
}

/// Builds an event table from `(event type, handler)` pairs.
pub fn event_table<I, K>(entries: I) -> EventTable
where
    I: IntoIterator<Item = (K, EventHandler)>,
    K: Into<String>,
{
    entries
        .into_iter()
        .map(|(event_type, handler)| (event_type.into(), handler))
        .collect()
}

#[derive(Clone)]
struct Route {
    module_id: String,
    handler: EventHandler,
}

/// Event type -> ordered routes across all modules.
#[derive(Default)]
pub struct EventRoutes {
    routes: HashMap<String, Vec<Route>>,
}

impl EventRoutes {
    /// Replaces every route owned by `module_id` with `table`.
    pub fn replace_table(&mut self, module_id: &str, table: &EventTable) {
        self.remove_module(module_id);
        for (event_type, handler) in table {
            self.routes
                .entry(event_type.clone())
                .or_default()
                .push(Route {
                    module_id: module_id.to_string(),
                    handler: Rc::clone(handler),
                });
        }
    }

    /// Drops every route owned by `module_id`.
    pub fn remove_module(&mut self, module_id: &str) {
        self.routes.retain(|_, routes| {
            routes.retain(|route| route.module_id != module_id);
            !routes.is_empty()
        });
    }

    /// Snapshot of handlers listening for `event_type`, in registration order.
    pub fn handlers_for(&self, event_type: &str) -> Vec<EventHandler> {
        self.routes
            .get(event_type)
            .map(|routes| routes.iter().map(|route| Rc::clone(&route.handler)).collect())
            .unwrap_or_default()
    }

    /// Module ids listening for `event_type`, in registration order.
    pub fn listeners_of(&self, event_type: &str) -> Vec<String> {
        self.routes
            .get(event_type)
            .map(|routes| routes.iter().map(|route| route.module_id.clone()).collect())
            .unwrap_or_default()
    }
}

impl Debug for EventRoutes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.routes.keys().collect();
        types.sort();
        f.debug_struct("EventRoutes").field("types", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{event_table, Event, EventHandler, EventRoutes};
    use serde_json::{json, Value};
    use std::rc::Rc;

    fn noop() -> EventHandler {
        Rc::new(|_: &Value| {})
    }

    #[test]
    fn replacing_a_table_drops_old_routes() {
        let mut routes = EventRoutes::default();
        routes.replace_table("a", &event_table([("ping", noop()), ("pong", noop())]));
        routes.replace_table("b", &event_table([("ping", noop())]));
        assert_eq!(routes.listeners_of("ping"), vec!["a", "b"]);

        routes.replace_table("a", &event_table([("pong", noop())]));
        assert_eq!(routes.listeners_of("ping"), vec!["b"]);
        assert_eq!(routes.listeners_of("pong"), vec!["a"]);
    }

    #[test]
    fn re_registration_moves_module_to_end_of_type_order() {
        let mut routes = EventRoutes::default();
        routes.replace_table("a", &event_table([("ping", noop())]));
        routes.replace_table("b", &event_table([("ping", noop())]));
        routes.replace_table("a", &event_table([("ping", noop())]));
        assert_eq!(routes.listeners_of("ping"), vec!["b", "a"]);
    }

    #[test]
    fn removing_module_clears_empty_types() {
        let mut routes = EventRoutes::default();
        routes.replace_table("a", &event_table([("ping", noop())]));
        routes.remove_module("a");
        assert!(routes.handlers_for("ping").is_empty());
    }

    #[test]
    fn event_requires_non_blank_type() {
        assert!(Event::new("ping", json!(1)).is_well_formed());
        assert!(!Event::signal("  ").is_well_formed());
    }
}
