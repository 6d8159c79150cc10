//! Vbook CLI
//!
//! Installs extensions on a Vbook app and runs extension scripts on it,
//! serving project files back to the app while a test runs.

pub mod client;
pub mod commands;
pub mod config;
pub mod installer;
pub mod output;
pub mod server;
pub mod tester;

pub use client::VbookClient;
pub use config::CliConfig;
pub use installer::VbookInstaller;
pub use server::LocalServer;
pub use tester::{TestSettings, TestState, VbookTester};
