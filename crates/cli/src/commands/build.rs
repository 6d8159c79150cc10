//! Build Command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use vbook_common::{build_package, ProjectValidator};

use crate::output::print_success;

#[derive(Parser)]
pub struct BuildArgs {
    /// Project directory (defaults to the current directory)
    pub project: Option<PathBuf>,
}

pub fn execute(args: BuildArgs) -> Result<()> {
    let project = ProjectValidator::new().resolve_project_path(args.project.as_deref())?;
    let output = build_package(&project).context("failed to build extension")?;

    match std::fs::metadata(&output) {
        Ok(meta) => print_success(&format!(
            "Extension built successfully: {} ({} bytes)",
            output.display(),
            meta.len()
        )),
        Err(_) => print_success(&format!("Extension built successfully: {}", output.display())),
    }
    Ok(())
}
