//! Module author contract.

use crate::sandbox::Sandbox;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Lifecycle every registered module must implement.
pub trait Module {
    /// Called once after the registry stores the started instance.
    fn init(&mut self);
    /// Called once when the module is stopped or replaced.
    fn destroy(&mut self);
}

/// Factory building one module instance around its sandbox.
pub type ModuleFactory = Rc<dyn Fn(Sandbox) -> Result<Box<dyn Module>, ModuleBuildError>>;

/// Factory refusal reported back to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBuildError {
    pub reason: String,
}

impl ModuleBuildError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Display for ModuleBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "module factory refused to build: {}", self.reason)
    }
}

impl Error for ModuleBuildError {}
