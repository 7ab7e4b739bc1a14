//! Leaf services the dashboard store depends on.

pub mod projects;
pub mod storage;

pub use projects::{FetchError, MockProjectSource, ProjectSource};
pub use storage::{FileStorage, MemoryStorage, STORAGE_KEY, StorageBackend, StorageService};
