//! Observable state container.
//!
//! A `Signal<T>` holds one value behind an `ArcSwap` so readers never block,
//! serializes writers with a mutex, and bumps a `watch` channel version on
//! every write so subscribers can react to changes.

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub struct Signal<T> {
    value: ArcSwap<T>,
    write_lock: Mutex<()>,
    version: watch::Sender<u64>,
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            value: ArcSwap::from_pointee(value),
            write_lock: Mutex::new(()),
            version,
        }
    }

    /// Current value.
    pub fn get(&self) -> Arc<T> {
        self.value.load_full()
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.value.store(Arc::new(value));
        self.bump();
    }

    /// Compute a new value from the current one and store it atomically with
    /// respect to other writers. Returns whatever `f` returns alongside.
    pub fn update<R>(&self, f: impl FnOnce(&T) -> (T, R)) -> R {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.value.load();
        let (next, ret) = f(&current);
        self.value.store(Arc::new(next));
        self.bump();
        ret
    }

    /// Like [`update`](Self::update), but `f` may decline the write by
    /// returning `None`, in which case nothing is stored or notified.
    pub fn update_if(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.value.load();
        match f(&current) {
            Some(next) => {
                self.value.store(Arc::new(next));
                self.bump();
                true
            }
            None => false,
        }
    }

    /// Receiver that observes a new version after each write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Number of writes so far.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

impl<T: Default> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}
