//! Install workflow: validate the project, package it and push it to the app

use std::path::Path;

use anyhow::Context;
use tracing::info;

use vbook_common::{PluginData, ProjectValidator};

use crate::client::VbookClient;
use crate::config::CliConfig;

pub struct VbookInstaller {
    client: VbookClient,
    validator: ProjectValidator,
}

impl VbookInstaller {
    pub fn new(config: &CliConfig) -> Self {
        Self {
            client: VbookClient::new(config.timeout()),
            validator: ProjectValidator::new(),
        }
    }

    /// Build the install payload for `project`.
    pub fn prepare(&self, project: &Path) -> anyhow::Result<PluginData> {
        self.validator
            .validate_project(project)
            .context("project validation failed")?;
        let data = PluginData::from_project(project).context("failed to prepare plugin data")?;
        data.validate().context("invalid plugin data")?;
        Ok(data)
    }

    /// Install `project` on the app at `app_url`, returning what was sent.
    pub async fn install(&self, project: &Path, app_url: &str) -> anyhow::Result<PluginData> {
        let data = self.prepare(project)?;
        info!("Installing '{}' ({}) to {}", data.name, data.id, app_url);
        self.client
            .send_install(app_url, &data)
            .await
            .context("installation request failed")?;
        Ok(data)
    }
}
