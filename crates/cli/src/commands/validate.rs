//! Validate Command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use vbook_common::{read_manifest, ProjectValidator};

use crate::output::{print_success, print_warning};

#[derive(Parser)]
pub struct ValidateArgs {
    /// Project directory (defaults to the current directory)
    pub project: Option<PathBuf>,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let validator = ProjectValidator::new();
    let project = validator.resolve_project_path(args.project.as_deref())?;

    validator
        .validate_project(&project)
        .context("project validation failed")?;
    let manifest = read_manifest(&project)?;
    if let Err(e) = manifest.validate() {
        print_warning(&format!("plugin.json cannot be installed yet: {}", e.user_message()));
    }

    print_success(&format!(
        "{} is a valid extension project ({} v{})",
        project.display(),
        manifest.metadata.name,
        manifest.metadata.version
    ));
    Ok(())
}
