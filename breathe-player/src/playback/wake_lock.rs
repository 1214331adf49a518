//! Wake lock collaborator interface
//!
//! Keeps the host awake while a run is active. Failures are non-fatal: the
//! run proceeds without the lock.

use crate::error::Result;

pub trait WakeLock: Send + Sync {
    fn acquire(&self) -> Result<()>;
    fn release(&self) -> Result<()>;
}

/// Wake lock for hosts without power management
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn acquire(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) -> Result<()> {
        Ok(())
    }
}
