// Adapters layer: concrete implementations of the domain ports and OS integrations
pub mod browser;
pub mod fs_watch;
pub mod network;
pub mod process;
pub mod sqlite;
pub mod window;
