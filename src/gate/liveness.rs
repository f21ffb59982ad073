use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Scope-owned liveness flag. Alive from mount until `revoke()`; every async
/// continuation mutates gate state only through `run_if_alive`.
///
/// `revoke()` waits for a closure already running under `run_if_alive`, so
/// once it returns no mutation is in flight and none can start, whatever
/// thread the runtime schedules the continuation on.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<Mutex<bool>>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(Mutex::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        *self.lock()
    }

    pub fn revoke(&self) {
        *self.lock() = false;
    }

    /// Runs `f` only while alive, holding off `revoke()` until it returns.
    /// `f` must not tear the gate down itself.
    pub fn run_if_alive<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let alive = self.lock();
        if !*alive {
            return None;
        }
        let result = f();
        drop(alive);
        Some(result)
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.alive.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
