//! # lightcontrol-app
//!
//! Application layer: services and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `StateStore`: key/value state plus publish/subscribe channels
//!   - `LightDriver`: physical on/off/color/brightness operations
//!   - `Clock`: local wall-clock time
//! - Define the **services**, each an independent event loop:
//!   - `CommandProcessor`: the single writer of per-group state
//!   - `ProgramScheduler`: morning/evening programs and day/night defaults
//!   - `TimerManager`: debounced auto-off timers per group
//!   - `TriggerRouter`: sensor name to timer-start fan-out
//! - Provide **in-process infrastructure** (message bus, in-memory store) that doesn't need IO
//!
//! Services never call each other. Everything they share goes through the
//! store's keys (see [`keys`]) and channels.
//!
//! ## Dependency rule
//! Depends on `lightcontrol-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod keys;
pub mod memory_store;
pub mod message_bus;
pub mod ports;
pub mod services;
