//! Extension project layout checks
//!
//! A project directory holds `plugin.json`, `icon.png` and a `src/`
//! directory with at least one `.js` file.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

pub const MANIFEST_FILE: &str = "plugin.json";
pub const ICON_FILE: &str = "icon.png";
pub const SRC_DIR: &str = "src";

#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectValidator;

impl ProjectValidator {
    pub fn new() -> Self {
        Self
    }

    /// Full check used before testing and installing.
    pub fn validate_project(&self, project: &Path) -> Result<()> {
        let meta = std::fs::metadata(project).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::project(project, "project path does not exist")
            } else {
                Error::filesystem("stat", project, e)
            }
        })?;
        if !meta.is_dir() {
            return Err(Error::project(project, "project path is not a directory"));
        }

        let manifest = project.join(MANIFEST_FILE);
        require_file(project, &manifest, MANIFEST_FILE)?;
        validate_manifest_shape(&manifest)?;

        require_file(project, &project.join(ICON_FILE), ICON_FILE)?;

        let src = project.join(SRC_DIR);
        require_dir(project, &src, SRC_DIR)?;
        require_scripts(project, &src)?;

        debug!("Project {} is valid", project.display());
        Ok(())
    }

    /// Walk up from the script's directory to the first one holding `plugin.json`.
    pub fn find_project_root(&self, script_path: &Path) -> Result<PathBuf> {
        let start = script_path.parent().unwrap_or(script_path);
        start
            .ancestors()
            .find(|dir| dir.join(MANIFEST_FILE).is_file())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                Error::project(
                    script_path,
                    "plugin.json not found in script path or parent directories",
                )
            })
    }

    /// Resolve a user-supplied project path, defaulting to the working directory.
    pub fn resolve_project_path(&self, path: Option<&Path>) -> Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        let resolved = match path {
            None => return Ok(cwd),
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => cwd.join(p),
        };
        if !resolved.exists() {
            return Err(Error::project(&resolved, "path does not exist"));
        }
        Ok(resolved)
    }
}

fn require_file(project: &Path, path: &Path, name: &str) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(Error::project(
            project,
            format!("'{}' should be a file, not a directory", name),
        )),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::project(
            project,
            format!("required file '{}' not found", name),
        )),
        Err(e) => Err(Error::filesystem("stat", path, e)),
    }
}

fn require_dir(project: &Path, path: &Path, name: &str) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => Err(Error::project(
            project,
            format!("'{}' should be a directory, not a file", name),
        )),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::project(
            project,
            format!("required directory '{}' not found", name),
        )),
        Err(e) => Err(Error::filesystem("stat", path, e)),
    }
}

fn require_scripts(project: &Path, src: &Path) -> Result<()> {
    let entries = std::fs::read_dir(src).map_err(|e| Error::filesystem("read", src, e))?;
    let has_scripts = entries
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.path().is_file() && is_script(&entry.path()));

    if has_scripts {
        Ok(())
    } else {
        Err(Error::project(
            project,
            "src directory must contain at least one JavaScript (.js) file",
        ))
    }
}

pub(crate) fn is_script(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "js")
}

fn validate_manifest_shape(manifest: &Path) -> Result<()> {
    let data = std::fs::read(manifest).map_err(|e| Error::filesystem("read", manifest, e))?;
    let value: Value = serde_json::from_slice(&data)
        .map_err(|e| Error::Manifest(format!("plugin.json is not valid JSON: {}", e)))?;

    for section in ["metadata", "script"] {
        if value.get(section).is_none() {
            return Err(Error::Manifest(format!(
                "plugin.json missing required '{}' section",
                section
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::Path;

    pub const MANIFEST: &str = r#"{
        "metadata": {
            "name": "Test Plugin",
            "author": "Test Author",
            "version": 3,
            "source": "https://example.com",
            "regexp": "example\\.com/book/\\d+",
            "description": "demo",
            "locale": "en_US",
            "tag": "",
            "type": "novel"
        },
        "script": {
            "home": "home.js",
            "detail": "detail.js",
            "toc": "toc.js",
            "chap": "chap.js"
        }
    }"#;

    /// Lay out a complete extension project under `dir`
    pub fn write_project(dir: &Path) {
        fs::write(dir.join("plugin.json"), MANIFEST).unwrap();
        fs::write(dir.join("icon.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/detail.js"), "function execute(url) { return url; }").unwrap();
        fs::write(dir.join("src/toc.js"), "function execute(url) { return []; }").unwrap();
        fs::write(dir.join("src/notes.txt"), "not a script").unwrap();
    }
}
