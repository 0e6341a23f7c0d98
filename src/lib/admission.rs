//! Single-flight admission gate for elevated commands
//!
//! Only one elevated command may be in flight at a time, so the user never
//! sees two consent prompts stacked on top of each other. Admission does
//! not wait: a second request fails fast with [`Error::Busy`].

use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Gate shared by everything that can request elevation
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    holder: Arc<Mutex<Option<String>>>,
}

/// Held for the duration of an elevated run
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
    holder: Arc<Mutex<Option<String>>>,
}

impl Drop for Admission {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.holder.lock() {
            *guard = None;
        }
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            holder: Arc::new(Mutex::new(None)),
        }
    }

    /// Try to admit `operation`; fails with [`Error::Busy`] if the gate is held
    pub fn try_admit(&self, operation: &str) -> Result<Admission> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                if let Ok(mut guard) = self.holder.lock() {
                    *guard = Some(operation.to_string());
                }
                Ok(Admission {
                    _permit: permit,
                    holder: Arc::clone(&self.holder),
                })
            }
            Err(_) => {
                let running = self
                    .holder
                    .lock()
                    .ok()
                    .and_then(|guard| guard.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                Err(Error::Busy(running))
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }
}
