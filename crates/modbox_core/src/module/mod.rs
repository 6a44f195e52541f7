//! Module lifecycle and inter-module events.
//!
//! # Responsibility
//! - Define the lifecycle contract module authors implement.
//! - Keep the registry as the only owner of module entries.
//!
//! # See also
//! - `crate::sandbox` for the capability object modules receive.

pub mod contract;
pub mod events;
pub mod registry;
