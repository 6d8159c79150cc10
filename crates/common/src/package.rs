//! Distributable extension package
//!
//! `plugin.zip` holds `plugin.json`, `icon.png` and everything under `src/`,
//! with entry names relative to the project root.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::project::{ICON_FILE, MANIFEST_FILE, SRC_DIR};
use crate::{Error, ProjectValidator, Result};

pub const PACKAGE_FILE: &str = "plugin.zip";

/// Validate `project` and write `<project>/plugin.zip`, returning its path.
pub fn build_package(project: &Path) -> Result<PathBuf> {
    ProjectValidator::new().validate_project(project)?;

    let output = project.join(PACKAGE_FILE);
    let file = File::create(&output).map_err(|e| Error::filesystem("write", &output, e))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for name in [MANIFEST_FILE, ICON_FILE] {
        add_file(&mut writer, options, &project.join(name), name.to_string())?;
    }

    let src = project.join(SRC_DIR);
    for entry in walkdir::WalkDir::new(&src).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::filesystem("read", &src, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry_name(project, entry.path());
        add_file(&mut writer, options, entry.path(), name)?;
    }

    writer
        .finish()
        .map_err(|e| Error::Archive(format!("zip: {}", e)))?
        .flush()
        .map_err(|e| Error::filesystem("write", &output, e))?;

    info!("Package written to {}", output.display());
    Ok(output)
}

fn add_file(
    writer: &mut ZipWriter<File>,
    options: SimpleFileOptions,
    path: &Path,
    name: String,
) -> Result<()> {
    let mut source = File::open(path).map_err(|e| Error::filesystem("read", path, e))?;
    debug!("Adding {}", name);
    writer
        .start_file(name.as_str(), options)
        .map_err(|e| Error::Archive(format!("zip entry {}: {}", name, e)))?;
    io::copy(&mut source, writer).map_err(|e| Error::filesystem("read", path, e))?;
    Ok(())
}

/// Forward-slash path of `path` below `project`
fn entry_name(project: &Path, path: &Path) -> String {
    path.strip_prefix(project)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::fixtures;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    fn entry_names(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_package_layout() {
        let dir = tempdir().unwrap();
        fixtures::write_project(dir.path());
        fs::create_dir_all(dir.path().join("src/lib")).unwrap();
        fs::write(dir.path().join("src/lib/util.js"), "var x = 1;").unwrap();
        fs::write(dir.path().join("README.md"), "left out").unwrap();

        let output = build_package(dir.path()).unwrap();
        assert_eq!(output, dir.path().join("plugin.zip"));

        let mut names = entry_names(&output);
        assert_eq!(&names[..2], ["plugin.json", "icon.png"]);
        names.sort();
        assert_eq!(
            names,
            [
                "icon.png",
                "plugin.json",
                "src/detail.js",
                "src/lib/util.js",
                "src/notes.txt",
                "src/toc.js",
            ]
        );

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let mut script = String::new();
        archive
            .by_name("src/detail.js")
            .unwrap()
            .read_to_string(&mut script)
            .unwrap();
        assert_eq!(script, "function execute(url) { return url; }");
        assert_eq!(
            archive.by_name("plugin.json").unwrap().compression(),
            CompressionMethod::Deflated
        );
    }

    #[test]
    fn test_rebuild_replaces_package() {
        let dir = tempdir().unwrap();
        fixtures::write_project(dir.path());

        let first = build_package(dir.path()).unwrap();
        fs::remove_file(dir.path().join("src/notes.txt")).unwrap();
        let second = build_package(dir.path()).unwrap();

        assert_eq!(first, second);
        assert!(!entry_names(&second).iter().any(|n| n == "src/notes.txt"));
        assert!(!entry_names(&second).iter().any(|n| n.ends_with("plugin.zip")));
    }

    #[test]
    fn test_invalid_project_writes_nothing() {
        let dir = tempdir().unwrap();
        fixtures::write_project(dir.path());
        fs::remove_file(dir.path().join("icon.png")).unwrap();

        let err = build_package(dir.path()).unwrap_err();
        assert!(err.to_string().contains("icon.png"));
        assert!(!dir.path().join(PACKAGE_FILE).exists());
    }
}
