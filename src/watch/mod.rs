pub mod cycle;
pub mod state;
pub mod watcher;
