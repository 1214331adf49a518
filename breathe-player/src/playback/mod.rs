//! Real-time playback of exercise plans

pub mod controller;
pub mod cursor;
mod run;
pub mod sound;
pub mod wake_lock;

pub use controller::PlaybackController;
pub use cursor::StepCursor;
pub use sound::{LogSoundPlayer, SoundPlayer};
pub use wake_lock::{NoopWakeLock, WakeLock};
