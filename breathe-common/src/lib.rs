//! # Breathe Common Library
//!
//! Shared code for the breathing exercise player including:
//! - Phase and repetition types
//! - Event types (BreathEvent enum) and the EventBus
//! - Configuration loading
//! - Human-readable duration formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{Phase, PhaseKind, PlayStatus, RepetitionInfo};
