//! Test orchestration
//!
//! Runs one script against the app: validate the workspace, resolve the app
//! address, start the file server, pick an address the app can reach it on,
//! then send the request. The file server is stopped on every path once it
//! has started.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{debug, info};

use vbook_common::netselect::{select_local_address_from, InterfaceSource, SystemInterfaces};
use vbook_common::{parse_vbook_url, ProjectValidator, TestRequest, TestResponse, VbookUrl};

use crate::client::VbookClient;
use crate::config::CliConfig;
use crate::server::LocalServer;

/// Progress of a single test run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    ValidatingWorkspace,
    ResolvingTarget,
    StartingLocalServer,
    SelectingLocalIp,
    SendingRequest,
    Done,
    Failed,
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestState::ValidatingWorkspace => "validating-workspace",
            TestState::ResolvingTarget => "resolving-target",
            TestState::StartingLocalServer => "starting-local-server",
            TestState::SelectingLocalIp => "selecting-local-ip",
            TestState::SendingRequest => "sending-request",
            TestState::Done => "done",
            TestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-run inputs: where the app is and what to feed the script
#[derive(Debug, Clone, Default)]
pub struct TestSettings {
    pub app_url: String,
    pub params: Vec<String>,
}

impl TestSettings {
    pub fn new(app_url: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            app_url: app_url.into(),
            params,
        }
    }
}

pub struct VbookTester {
    config: CliConfig,
    client: VbookClient,
    validator: ProjectValidator,
    interfaces: Arc<dyn InterfaceSource + Send + Sync>,
}

impl VbookTester {
    pub fn new(config: CliConfig) -> Self {
        Self {
            client: VbookClient::new(config.timeout()),
            config,
            validator: ProjectValidator::new(),
            interfaces: Arc::new(SystemInterfaces),
        }
    }

    /// Replace the source of local addresses offered to the app.
    pub fn with_interfaces(mut self, source: impl InterfaceSource + Send + Sync + 'static) -> Self {
        self.interfaces = Arc::new(source);
        self
    }

    /// Run `script_path` on the app described by `settings`.
    pub async fn test_script(
        &self,
        script_path: &Path,
        settings: &TestSettings,
    ) -> anyhow::Result<TestResponse> {
        let mut state = TestState::ValidatingWorkspace;
        debug!("Test state: {}", state);

        let outcome = self.run(script_path, settings, &mut state).await;
        match &outcome {
            Ok(response) => {
                advance(&mut state, TestState::Done);
                info!("Test finished with status '{}'", response.status);
            }
            Err(e) => {
                debug!("Test failed during {}: {:#}", state, e);
                advance(&mut state, TestState::Failed);
            }
        }
        outcome
    }

    async fn run(
        &self,
        script_path: &Path,
        settings: &TestSettings,
        state: &mut TestState,
    ) -> anyhow::Result<TestResponse> {
        let (project, script) = self.load_workspace(script_path).context("invalid workspace")?;

        advance(state, TestState::ResolvingTarget);
        let target = parse_vbook_url(&settings.app_url).context("invalid app URL")?;
        let server_port = self.config.server_port(target.port).ok_or_else(|| {
            anyhow!(
                "app port {} is too low for a file server {} ports below it",
                target.port,
                self.config.server_port_offset
            )
        })?;

        advance(state, TestState::StartingLocalServer);
        // the app asks for `<project name>/src`, relative to the project's parent
        let serving_root = project.parent().unwrap_or(project.as_path());
        let server = LocalServer::start(server_port, serving_root)
            .await
            .context("failed to start local file server")?;
        tokio::time::sleep(self.config.settle_delay()).await;

        let result = self
            .exchange(&server, &project, &target, script, settings, state)
            .await;
        server.stop().await;
        result
    }

    fn load_workspace(&self, script_path: &Path) -> anyhow::Result<(PathBuf, String)> {
        let script_path = script_path
            .canonicalize()
            .with_context(|| format!("script {} not found", script_path.display()))?;
        let project = self.validator.find_project_root(&script_path)?;
        self.validator
            .validate_project(&project)
            .context("project validation failed")?;
        let script = std::fs::read_to_string(&script_path)
            .with_context(|| format!("failed to read script file {}", script_path.display()))?;
        debug!("Project root: {}", project.display());
        Ok((project, script))
    }

    async fn exchange(
        &self,
        server: &LocalServer,
        project: &Path,
        target: &VbookUrl,
        script: String,
        settings: &TestSettings,
        state: &mut TestState,
    ) -> anyhow::Result<TestResponse> {
        advance(state, TestState::SelectingLocalIp);
        let local_url = select_local_address_from(
            self.interfaces.as_ref(),
            server.port(),
            &target.interface_prefix(),
        )
        .context("failed to get local IP")?;

        advance(state, TestState::SendingRequest);
        let request = TestRequest::new(
            local_url,
            source_root(project),
            script,
            TestRequest::input_from_params(&settings.params),
        );
        request.validate()?;
        info!("Testing against {} (files served from {})", target.base, request.ip);

        self.client
            .send_test(&target.base, &request)
            .await
            .context("test request failed")
    }
}

fn advance(state: &mut TestState, next: TestState) {
    debug!("Test state: {} -> {}", state, next);
    *state = next;
}

/// `root` sent to the app: the project directory name followed by `/src`
fn source_root(project: &Path) -> String {
    let name = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/src", name)
}
