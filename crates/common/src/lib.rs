//! Vbook Common Library
//!
//! Protocol types, address handling and project checks shared by the
//! Vbook extension tooling.

pub mod error;
pub mod netselect;
pub mod package;
pub mod plugin;
pub mod project;
pub mod response;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use error::{Error, Result};
pub use netselect::{select_from_candidates, select_local_address, InterfaceAddr, InterfaceSource};
pub use package::{build_package, PACKAGE_FILE};
pub use plugin::{read_manifest, PluginConfig, PluginData};
pub use project::ProjectValidator;
pub use response::{parse_test_response, to_raw_http};
pub use types::*;
pub use url::{normalize_vbook_url, parse_vbook_url, VbookUrl, DEFAULT_APP_PORT};

/// Vbook tooling version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
