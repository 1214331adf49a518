//! # Breathing Exercise Player Library (breathe-player)
//!
//! Plan model, step generator and real-time playback controller for guided
//! breathing exercises.
//!
//! **Architecture:** plans generate the phases of each repetition on demand
//! ([`plan`]); a [`playback::StepCursor`] walks them and the
//! [`PlaybackController`] plays them in real time on a tokio task, reporting
//! progress through [`SharedState`] and its event bus.

pub mod error;
pub mod plan;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use playback::PlaybackController;
pub use state::SharedState;
