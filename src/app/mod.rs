// Application layer: one entry point per subcommand
pub mod history;
pub mod interactive;
pub mod watch;
