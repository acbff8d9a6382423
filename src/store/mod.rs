//! Settings persistence and change propagation.

pub mod file;
pub mod memory;
pub mod traits;
pub mod watcher;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{Revision, SettingsStore};
pub use watcher::{load_snapshot, spawn_settings_watcher};
