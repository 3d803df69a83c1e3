pub mod secrets;
pub mod watch_config;
