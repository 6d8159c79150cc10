//! Extension manifest and install payload

use std::collections::BTreeMap;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::project::{is_script, ICON_FILE, MANIFEST_FILE, SRC_DIR};
use crate::{Error, Result};

/// `metadata` section of `plugin.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginMetadata {
    pub name: String,
    pub author: String,
    pub version: i64,
    pub source: String,
    pub regexp: String,
    pub description: String,
    pub locale: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `script` section of `plugin.json`: entry-point file per operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginScripts {
    pub home: String,
    pub genre: String,
    pub detail: String,
    pub search: String,
    pub page: String,
    pub toc: String,
    pub chap: String,
}

/// Parsed `plugin.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub metadata: PluginMetadata,
    #[serde(default)]
    pub script: PluginScripts,
}

impl PluginConfig {
    pub fn validate(&self) -> Result<()> {
        if self.metadata.name.is_empty() {
            return Err(Error::validation("metadata.name", "is required"));
        }
        if self.metadata.author.is_empty() {
            return Err(Error::validation("metadata.author", "is required"));
        }
        if self.metadata.source.is_empty() {
            return Err(Error::validation("metadata.source", "is required"));
        }
        if self.metadata.version <= 0 {
            return Err(Error::validation("metadata.version", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Read and parse `plugin.json` from a project directory.
pub fn read_manifest(project: &Path) -> Result<PluginConfig> {
    let path = project.join(MANIFEST_FILE);
    let data = std::fs::read(&path).map_err(|e| Error::filesystem("read", &path, e))?;
    serde_json::from_slice(&data)
        .map_err(|e| Error::Manifest(format!("failed to parse plugin.json: {}", e)))
}

/// Payload of `GET /install`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginData {
    pub id: String,
    pub name: String,
    pub author: String,
    pub version: String,
    pub description: String,
    pub source: String,
    pub regexp: String,
    pub locale: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub home: String,
    pub genre: String,
    pub detail: String,
    pub search: String,
    pub page: String,
    pub toc: String,
    pub chap: String,
    /// Data URL of the icon
    pub icon: String,
    pub enabled: bool,
    pub debug: bool,
    /// JSON object of script file name to script text, as a string
    pub data: String,
}

impl PluginData {
    /// Build the install payload from a project directory.
    pub fn from_project(project: &Path) -> Result<Self> {
        let config = read_manifest(project)?;
        config.validate()?;
        let icon = read_icon(project)?;
        let scripts = read_scripts(project)?;
        let data = serde_json::to_string(&scripts)?;

        let PluginConfig { metadata, script } = config;
        Ok(Self {
            id: format!("debug-{}", metadata.source),
            name: metadata.name,
            author: metadata.author,
            version: metadata.version.to_string(),
            description: metadata.description,
            source: metadata.source,
            regexp: metadata.regexp,
            locale: metadata.locale,
            tag: metadata.tag,
            kind: metadata.kind,
            home: script.home,
            genre: script.genre,
            detail: script.detail,
            search: script.search,
            page: script.page,
            toc: script.toc,
            chap: script.chap,
            icon,
            enabled: true,
            debug: true,
            data,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("id", &self.id),
            ("name", &self.name),
            ("author", &self.author),
            ("version", &self.version),
            ("source", &self.source),
            ("icon", &self.icon),
            ("data", &self.data),
        ];
        match required.iter().find(|(_, value)| value.is_empty()) {
            Some((field, _)) => Err(Error::validation(*field, "is required")),
            None => Ok(()),
        }
    }
}

fn read_icon(project: &Path) -> Result<String> {
    let path = project.join(ICON_FILE);
    let bytes = std::fs::read(&path).map_err(|e| Error::filesystem("read", &path, e))?;
    Ok(format!("data:image/*;base64,{}", STANDARD.encode(bytes)))
}

/// Top-level `.js` files of `src/`, keyed by file name
fn read_scripts(project: &Path) -> Result<BTreeMap<String, String>> {
    let src = project.join(SRC_DIR);
    let entries = std::fs::read_dir(&src).map_err(|e| Error::filesystem("read", &src, e))?;

    let mut scripts = BTreeMap::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::filesystem("read", &src, e))?.path();
        if !path.is_file() || !is_script(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let text = std::fs::read_to_string(&path).map_err(|e| Error::filesystem("read", &path, e))?;
        scripts.insert(name.to_string(), text);
    }

    if scripts.is_empty() {
        return Err(Error::project(project, "no JavaScript files found in src directory"));
    }
    Ok(scripts)
}
