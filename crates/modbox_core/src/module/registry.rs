//! Module registry: lifecycle and event dispatch.
//!
//! # Responsibility
//! - Own every module entry (factory, live instance, event table).
//! - Build one fresh sandbox per factory invocation.
//! - Route published events to listening modules.
//!
//! # Invariants
//! - An entry has a live instance if and only if the module is started.
//! - Starting a started module destroys the previous instance first.
//! - No registry borrow is held while module or handler code runs, so
//!   modules may call back into the registry from `init`, `destroy` or
//!   event handlers.
//! - An instance stopped or replaced while its own `init` is still running
//!   is destroyed right after `init` returns, exactly once.
//! - Module ids are trimmed on every lookup.
//! - Every failure is returned as `RegistryError` and also reported through
//!   the diagnostic gate.

use crate::diagnostics::{DiagnosticGate, Severity};
use crate::dom::DomAdapter;
use crate::module::contract::{Module, ModuleBuildError, ModuleFactory};
use crate::module::events::{Event, EventRoutes, EventTable};
use crate::sandbox::transport::{LoopbackTransport, Transport};
use crate::sandbox::Sandbox;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::rc::{Rc, Weak};

/// Registry operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidModuleId(String),
    ModuleNotFound(String),
    ModuleNotStarted(String),
    FactoryRejected { module_id: String, reason: String },
    MalformedEvent,
    NoEventTable(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidModuleId(value) => write!(f, "module id is invalid: `{value}`"),
            Self::ModuleNotFound(value) => write!(f, "module does not exist: {value}"),
            Self::ModuleNotStarted(value) => write!(f, "module has not been started: {value}"),
            Self::FactoryRejected { module_id, reason } => {
                write!(f, "module factory rejected for {module_id}: {reason}")
            }
            Self::MalformedEvent => write!(f, "event must carry a non-empty type"),
            Self::NoEventTable(value) => write!(f, "module has no registered events: {value}"),
        }
    }
}

impl Error for RegistryError {}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Live module instance.
///
/// The module cell is only borrowed for the duration of one lifecycle call.
struct LiveModule {
    module: RefCell<Box<dyn Module>>,
    destroy_pending: Cell<bool>,
}

type Instance = Rc<LiveModule>;

impl LiveModule {
    fn new(module: Box<dyn Module>) -> Instance {
        Rc::new(Self {
            module: RefCell::new(module),
            destroy_pending: Cell::new(false),
        })
    }

    fn init(&self) {
        if let Ok(mut module) = self.module.try_borrow_mut() {
            module.init();
        }
        if self.destroy_pending.replace(false) {
            self.destroy();
        }
    }

    /// Destroys now, or right after a running `init` returns.
    fn destroy(&self) {
        match self.module.try_borrow_mut() {
            Ok(mut module) => module.destroy(),
            Err(_) => self.destroy_pending.set(true),
        }
    }
}

struct ModuleEntry {
    factory: ModuleFactory,
    instance: Option<Instance>,
    events: Option<EventTable>,
}

#[derive(Default)]
struct RegistryState {
    order: Vec<String>,
    entries: HashMap<String, ModuleEntry>,
    routes: EventRoutes,
}

pub(crate) struct RegistryInner {
    dom: Rc<dyn DomAdapter>,
    transport: Rc<dyn Transport>,
    gate: DiagnosticGate,
    state: RefCell<RegistryState>,
}

/// Shared handle to one module registry.
///
/// Cloning the handle shares the same registry.
#[derive(Clone)]
pub struct ModuleRegistry {
    inner: Rc<RegistryInner>,
}

/// Non-owning registry handle held by sandboxes.
#[derive(Clone)]
pub struct WeakRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakRegistry {
    pub fn upgrade(&self) -> Option<ModuleRegistry> {
        self.inner.upgrade().map(|inner| ModuleRegistry { inner })
    }
}

impl ModuleRegistry {
    /// Creates a registry over `dom` with a loopback transport.
    pub fn new(dom: Rc<dyn DomAdapter>) -> Self {
        Self::with_transport(dom, Rc::new(LoopbackTransport::new()))
    }

    pub fn with_transport(dom: Rc<dyn DomAdapter>, transport: Rc<dyn Transport>) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                dom,
                transport,
                gate: DiagnosticGate::default(),
                state: RefCell::new(RegistryState::default()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn dom(&self) -> Rc<dyn DomAdapter> {
        Rc::clone(&self.inner.dom)
    }

    pub fn transport(&self) -> Rc<dyn Transport> {
        Rc::clone(&self.inner.transport)
    }

    /// Enables or disables diagnostic output for this registry.
    pub fn debug(&self, on: bool) {
        self.inner.gate.set_enabled(on);
    }

    pub fn is_debug(&self) -> bool {
        self.inner.gate.is_enabled()
    }

    /// Reports `message` through the diagnostic gate.
    ///
    /// `1` is informational, `2` a warning, anything else an error. Returns
    /// whether the message was emitted.
    pub fn log(&self, level: u8, message: &str) -> bool {
        self.inner.gate.emit(Severity::from_level(level), message)
    }

    /// Number of diagnostics emitted since the registry was built.
    pub fn diagnostics_emitted(&self) -> u64 {
        self.inner.gate.emitted()
    }

    /// Registers `factory` under `module_id` after probing it once.
    ///
    /// The probe instance is built around a throwaway sandbox and dropped
    /// without `init`. Re-creating an id destroys a started instance and
    /// drops the previous event table.
    pub fn create<F>(&self, module_id: &str, factory: F) -> RegistryResult<()>
    where
        F: Fn(Sandbox) -> Result<Box<dyn Module>, ModuleBuildError> + 'static,
    {
        let module_id = self.require_id(module_id, "module_create")?;
        let factory: ModuleFactory = Rc::new(factory);

        if let Err(err) = factory(Sandbox::new(self, &module_id)) {
            return Err(self.fail(
                "module_create",
                RegistryError::FactoryRejected {
                    module_id,
                    reason: err.reason,
                },
            ));
        }

        let replaced = {
            let mut state = self.inner.state.borrow_mut();
            state.routes.remove_module(&module_id);
            let previous = state.entries.insert(
                module_id.clone(),
                ModuleEntry {
                    factory,
                    instance: None,
                    events: None,
                },
            );
            if previous.is_none() {
                state.order.push(module_id.clone());
            }
            previous.and_then(|entry| entry.instance)
        };
        if let Some(instance) = replaced {
            instance.destroy();
        }

        self.trace("module_create", &module_id);
        Ok(())
    }

    /// Builds a fresh instance for `module_id` and calls `init` on it.
    pub fn start(&self, module_id: &str) -> RegistryResult<()> {
        let module_id = self.require_id(module_id, "module_start")?;
        let module_id = module_id.as_str();
        let (factory, previous) = {
            let mut state = self.inner.state.borrow_mut();
            match state.entries.get_mut(module_id) {
                Some(entry) => (Rc::clone(&entry.factory), entry.instance.take()),
                None => {
                    return Err(self.fail(
                        "module_start",
                        RegistryError::ModuleNotFound(module_id.to_string()),
                    ));
                }
            }
        };
        if let Some(previous) = previous {
            previous.destroy();
            self.trace("module_restart", module_id);
        }

        let instance = match factory(Sandbox::new(self, module_id)) {
            Ok(instance) => LiveModule::new(instance),
            Err(err) => {
                return Err(self.fail(
                    "module_start",
                    RegistryError::FactoryRejected {
                        module_id: module_id.to_string(),
                        reason: err.reason,
                    },
                ));
            }
        };

        let stored = {
            let mut state = self.inner.state.borrow_mut();
            match state.entries.get_mut(module_id) {
                Some(entry) => {
                    entry.instance = Some(Rc::clone(&instance));
                    true
                }
                None => false,
            }
        };
        if !stored {
            return Err(self.fail(
                "module_start",
                RegistryError::ModuleNotFound(module_id.to_string()),
            ));
        }

        instance.init();
        self.trace("module_start", module_id);
        Ok(())
    }

    /// Starts every registered module in registration order.
    ///
    /// Every module is attempted; the first failure is returned.
    pub fn start_all(&self) -> RegistryResult<()> {
        let mut first_error = None;
        for module_id in self.module_ids() {
            if let Err(err) = self.start(&module_id) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Destroys and clears the live instance of `module_id`.
    pub fn stop(&self, module_id: &str) -> RegistryResult<()> {
        let module_id = self.require_id(module_id, "module_stop")?;
        let module_id = module_id.as_str();
        let instance = {
            let mut state = self.inner.state.borrow_mut();
            match state.entries.get_mut(module_id) {
                Some(entry) => entry.instance.take(),
                None => {
                    return Err(self.fail(
                        "module_stop",
                        RegistryError::ModuleNotFound(module_id.to_string()),
                    ));
                }
            }
        };
        let Some(instance) = instance else {
            return Err(self.fail(
                "module_stop",
                RegistryError::ModuleNotStarted(module_id.to_string()),
            ));
        };

        instance.destroy();
        self.trace("module_stop", module_id);
        Ok(())
    }

    /// Stops every started module in registration order.
    pub fn stop_all(&self) -> RegistryResult<()> {
        let mut first_error = None;
        for module_id in self.module_ids() {
            if !self.is_started(&module_id) {
                continue;
            }
            if let Err(err) = self.stop(&module_id) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Replaces the event table of `module_id` wholesale.
    pub fn register_events(&self, table: EventTable, module_id: &str) -> RegistryResult<()> {
        let module_id = self.require_id(module_id, "events_register")?;
        {
            let mut state = self.inner.state.borrow_mut();
            let state = &mut *state;
            match state.entries.get_mut(&module_id) {
                Some(entry) => {
                    state.routes.replace_table(&module_id, &table);
                    entry.events = Some(table);
                }
                None => {
                    return Err(self.fail(
                        "events_register",
                        RegistryError::ModuleNotFound(module_id),
                    ));
                }
            }
        }
        self.trace("events_register", &module_id);
        Ok(())
    }

    /// Drops the whole event table of `module_id`.
    pub fn remove_events(&self, module_id: &str) -> RegistryResult<()> {
        let module_id = self.require_id(module_id, "events_remove")?;
        let module_id = module_id.as_str();
        let outcome = {
            let mut state = self.inner.state.borrow_mut();
            let state = &mut *state;
            match state.entries.get_mut(module_id) {
                Some(entry) if entry.events.is_some() => {
                    entry.events = None;
                    state.routes.remove_module(module_id);
                    Ok(())
                }
                Some(_) => Err(RegistryError::NoEventTable(module_id.to_string())),
                None => Err(RegistryError::ModuleNotFound(module_id.to_string())),
            }
        };
        match outcome {
            Ok(()) => {
                self.trace("events_remove", module_id);
                Ok(())
            }
            Err(err) => Err(self.fail("events_remove", err)),
        }
    }

    /// Invokes every handler listening for `event.event_type` with its data.
    ///
    /// Returns the number of handlers invoked. Handlers run synchronously in
    /// registration order; a panicking handler aborts the remaining dispatch.
    pub fn trigger_event(&self, event: &Event) -> RegistryResult<usize> {
        if !event.is_well_formed() {
            return Err(self.fail("event_trigger", RegistryError::MalformedEvent));
        }
        let handlers = self
            .inner
            .state
            .borrow()
            .routes
            .handlers_for(&event.event_type);
        for handler in &handlers {
            handler(&event.data);
        }
        Ok(handlers.len())
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.inner
            .state
            .borrow()
            .entries
            .contains_key(module_id.trim())
    }

    pub fn is_started(&self, module_id: &str) -> bool {
        self.inner
            .state
            .borrow()
            .entries
            .get(module_id.trim())
            .is_some_and(|entry| entry.instance.is_some())
    }

    pub fn has_events(&self, module_id: &str) -> bool {
        self.inner
            .state
            .borrow()
            .entries
            .get(module_id.trim())
            .is_some_and(|entry| entry.events.is_some())
    }

    /// Registered module ids in registration order.
    pub fn module_ids(&self) -> Vec<String> {
        self.inner.state.borrow().order.clone()
    }

    /// Module ids listening for `event_type`, in dispatch order.
    pub fn listeners_of(&self, event_type: &str) -> Vec<String> {
        self.inner.state.borrow().routes.listeners_of(event_type)
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().order.is_empty()
    }

    fn require_id(&self, module_id: &str, event: &str) -> RegistryResult<String> {
        let normalized = module_id.trim();
        if normalized.is_empty() {
            return Err(self.fail(
                event,
                RegistryError::InvalidModuleId(module_id.to_string()),
            ));
        }
        Ok(normalized.to_string())
    }

    fn fail(&self, event: &str, err: RegistryError) -> RegistryError {
        self.inner.gate.emit(
            Severity::Info,
            &format!("event={event} module=registry status=error reason={err}"),
        );
        err
    }

    fn trace(&self, event: &str, module_id: &str) {
        log::debug!("event={event} module=registry status=ok id={module_id}");
    }
}

impl Debug for ModuleRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ModuleRegistry")
            .field("modules", &state.order)
            .field("routes", &state.routes)
            .field("debug", &self.inner.gate.is_enabled())
            .finish()
    }
}
