//! Stress Env - Host environment probes
//!
//! Queries the operating system for figures the overlay reports but the
//! harness cannot measure itself.

pub mod memory;

pub use memory::{ProcessMemory, SystemMemory};
