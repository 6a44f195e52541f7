//! Suppressible diagnostic channel for registry misuse reports.
//!
//! The gate is owned by one registry; toggling it never affects the
//! process-wide logger configured by [`crate::logging`].

use log::{error, info, warn};
use std::cell::Cell;

/// Diagnostic severity, numbered like the public `log(severity, message)` API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// `1` is informational, `2` a warning, anything else an error.
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => Self::Info,
            2 => Self::Warning,
            _ => Self::Error,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warning => 2,
            Self::Error => 3,
        }
    }
}

/// Boolean gate in front of the `log` facade.
#[derive(Debug)]
pub struct DiagnosticGate {
    enabled: Cell<bool>,
    emitted: Cell<u64>,
}

impl Default for DiagnosticGate {
    fn default() -> Self {
        Self {
            enabled: Cell::new(true),
            emitted: Cell::new(0),
        }
    }
}

impl DiagnosticGate {
    pub fn set_enabled(&self, on: bool) {
        self.enabled.set(on);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Messages forwarded to the logger so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.get()
    }

    /// Emits `message` when the gate is open.
    ///
    /// Returns whether the message was forwarded to the logger.
    pub fn emit(&self, severity: Severity, message: &str) -> bool {
        if !self.enabled.get() {
            return false;
        }
        match severity {
            Severity::Info => info!("{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
        self.emitted.set(self.emitted.get() + 1);
        true
    }
}
