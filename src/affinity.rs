//! CPU affinity capability.
//!
//! Pinning is an optimization, never a correctness requirement. Workers
//! ask an [`Affinity`] implementation to pin them and log any error.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AffinityError {
    #[error("no CPU cores reported by the platform")]
    NoCores,

    #[error("failed to pin thread to core {core}")]
    PinFailed { core: usize },
}

/// Binds the calling thread to a core chosen from a worker index.
pub trait Affinity: Send + Sync {
    /// Pin the current thread for worker `index`. Returns the core used.
    fn pin_current(&self, index: usize) -> Result<usize, AffinityError>;
}

/// Pins to `index mod cores` using the platform's affinity API.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAffinity;

impl Affinity for CoreAffinity {
    fn pin_current(&self, index: usize) -> Result<usize, AffinityError> {
        let cores = match core_affinity::get_core_ids() {
            Some(ids) if !ids.is_empty() => ids,
            _ => return Err(AffinityError::NoCores),
        };
        let core = cores[index % cores.len()];
        if core_affinity::set_for_current(core) {
            Ok(core.id)
        } else {
            Err(AffinityError::PinFailed { core: core.id })
        }
    }
}

/// Leaves threads wherever the scheduler puts them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAffinity;

impl Affinity for NoAffinity {
    fn pin_current(&self, index: usize) -> Result<usize, AffinityError> {
        Ok(index % num_cpus::get().max(1))
    }
}
