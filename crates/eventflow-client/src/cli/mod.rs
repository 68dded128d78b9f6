pub mod config;
pub mod contacts;
pub mod send;
pub mod tickets;
pub mod watch;

pub use config::CliConfig;
