//! Shared fixtures for the CLI integration tests

#![allow(dead_code)]

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::net::TcpListener;

use vbook_common::{InterfaceAddr, InterfaceSource};
use vbook_cli::CliConfig;

pub const DETAIL_SCRIPT: &str = "function execute(url) { return Response.success(url); }";

/// Interfaces reported to the tester instead of the machine's own
pub struct FixedInterfaces(pub Vec<InterfaceAddr>);

impl FixedInterfaces {
    pub fn single(ip: &str) -> Self {
        let ip: IpAddr = ip.parse().unwrap();
        Self(vec![InterfaceAddr::new("eth0", ip)])
    }
}

impl InterfaceSource for FixedInterfaces {
    fn addresses(&self) -> Vec<InterfaceAddr> {
        self.0.clone()
    }
}

/// `<tmp>/my-ext` laid out as an extension project
pub fn extension_project() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("my-ext");
    write_project(&project);
    (dir, project)
}

pub fn write_project(project: &Path) {
    fs::create_dir_all(project.join("src")).unwrap();
    fs::write(
        project.join("plugin.json"),
        r#"{
            "metadata": {
                "name": "My Extension",
                "author": "tester",
                "version": 2,
                "source": "https://books.example",
                "regexp": "books\\.example/\\d+",
                "description": "integration fixture",
                "locale": "en_US",
                "type": "novel"
            },
            "script": {"detail": "detail.js", "toc": "toc.js"}
        }"#,
    )
    .unwrap();
    fs::write(project.join("icon.png"), [0x89, b'P', b'N', b'G', 0x0d, 0x0a]).unwrap();
    fs::write(project.join("src/detail.js"), DETAIL_SCRIPT).unwrap();
    fs::write(project.join("src/toc.js"), "function execute() { return []; }").unwrap();
}

pub fn fast_config() -> CliConfig {
    CliConfig {
        timeout_secs: 5,
        settle_delay_ms: 20,
        ..CliConfig::default()
    }
}

/// Bind a fake app on loopback whose file server port (10 below) is free.
pub async fn bind_fake_app(offset: u16) -> TcpListener {
    for _ in 0..50 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        if port <= offset {
            continue;
        }
        if std::net::TcpListener::bind(("0.0.0.0", port - offset)).is_ok() {
            return listener;
        }
    }
    panic!("no free port pair found");
}

/// Port of a loopback address nothing listens on
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
