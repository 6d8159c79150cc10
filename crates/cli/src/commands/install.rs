//! Install Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use vbook_common::ProjectValidator;

use crate::config::CliConfig;
use crate::installer::VbookInstaller;
use crate::output::{print_info, print_success};

#[derive(Parser)]
pub struct InstallArgs {
    /// Project directory (defaults to the current directory)
    pub project: Option<PathBuf>,

    /// Address of the Vbook app
    #[arg(long, env = "VBOOK_APP_URL")]
    pub app_url: String,
}

pub async fn execute(args: InstallArgs, config: CliConfig) -> Result<()> {
    let project = ProjectValidator::new().resolve_project_path(args.project.as_deref())?;
    print_info(&format!("Installing extension from {}", project.display()));

    let data = VbookInstaller::new(&config)
        .install(&project, &args.app_url)
        .await?;

    print_success(&format!(
        "Installed '{}' v{} by {}",
        data.name, data.version, data.author
    ));
    Ok(())
}
