// Library surface for headless/integration tests and reuse.
// The terminal UI lives in main.rs and only consumes these modules.
pub mod app_dirs;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod logging;
pub mod platform;
pub mod runtime;
pub mod session;
pub mod timer;
