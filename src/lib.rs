// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app;
pub mod app_dirs;
pub mod celebration;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod highscore;
pub mod round;
pub mod runtime;
pub mod session;
pub mod timer;
pub mod ui;
