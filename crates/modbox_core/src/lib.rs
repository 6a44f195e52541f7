//! Core of the modbox module framework.
//!
//! A `ModuleRegistry` creates, starts and stops named modules. Each module
//! receives a `Sandbox` scoped to its container element, and modules talk to
//! each other through the registry's event routes. The document itself sits
//! behind the `DomAdapter` trait.

pub mod diagnostics;
pub mod dom;
pub mod loader;
pub mod logging;
pub mod module;
pub mod sandbox;

pub use diagnostics::{DiagnosticGate, Severity};
pub use dom::memory::MemoryDocument;
pub use dom::{
    Attributes, DomAdapter, DomBinding, DomEvent, DomHandler, ElementHandle, Selection,
    DEFAULT_DOM_EVENT,
};
pub use loader::{load_modules, LoaderConfig, LoaderConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use module::contract::{Module, ModuleBuildError, ModuleFactory};
pub use module::events::{event_table, Event, EventHandler, EventTable};
pub use module::registry::{ModuleRegistry, RegistryError, RegistryResult, WeakRegistry};
pub use sandbox::transport::{
    Connection, HttpMethod, LoopbackTransport, SentRequest, Transport, TransportError,
};
pub use sandbox::{array_return_doubles, ElementConfig, Sandbox, SandboxError, IN_PLACE_CLASS};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
