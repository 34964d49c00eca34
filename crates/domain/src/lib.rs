//! # lightcontrol-domain
//!
//! Pure domain model for the lightcontrol home lighting system.
//!
//! ## Responsibilities
//! - Foundational types: group identifiers, broadcast targets, error conventions, timestamps
//! - Define **light state values** (colors, clamped brightness, brightness slots)
//! - Define **Commands** and their wire decoding (control channel payloads)
//! - Define **Messages** exchanged between services (timer starts, sensor triggers, state broadcasts)
//! - Define **Light programs** and the weekday-aware window arithmetic that schedules them
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod command;
pub mod group;
pub mod light;
pub mod message;
pub mod program;
