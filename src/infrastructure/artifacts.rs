//! Compiled-artifact loader - discovers {abi, bytecode} pairs on disk
//!
//! Accepts both common artifact layouts: hardhat-style files with a flat
//! `"bytecode": "0x…"` string and foundry-style files with
//! `"bytecode": {"object": "0x…"}`.

use std::fs;
use std::path::{Path, PathBuf};

use alloy_json_abi::JsonAbi;
use alloy_primitives::Bytes;
use walkdir::WalkDir;

/// One deployable compiled contract
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Name derived from the file stem
    pub name: String,
    pub abi: JsonAbi,
    /// Creation bytecode (constructor arguments get appended at deploy time)
    pub bytecode: Bytes,
    /// Source file the artifact was loaded from
    pub path: PathBuf,
}

/// Artifacts discovered under one directory, ordered by name
#[derive(Debug, Default)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
    /// Number of JSON files inspected
    pub scanned_files: usize,
    /// Per-file load errors
    pub errors: Vec<String>,
}

impl ArtifactSet {
    /// Scan a directory tree for deployable artifacts.
    ///
    /// Files without creation bytecode (interfaces, libraries compiled
    /// abstract) are skipped silently, matching how a deploy picker should
    /// never offer them.
    pub fn load_dir(root: impl AsRef<Path>) -> Self {
        let mut set = Self::default();

        for entry in WalkDir::new(root.as_ref())
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_ignored_dir(entry.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    set.errors.push(err.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            // Skip files larger than 5MB
            match entry.metadata() {
                Ok(metadata) if metadata.len() > 5 * 1024 * 1024 => continue,
                Err(err) => {
                    set.errors.push(format!("{}: {}", path.display(), err));
                    continue;
                }
                _ => {}
            }

            set.scanned_files += 1;
            match load_artifact(path) {
                Ok(Some(artifact)) => set.artifacts.push(artifact),
                Ok(None) => {}
                Err(err) => set.errors.push(format!("{}: {}", path.display(), err)),
            }
        }

        set.artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        set
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Load one artifact file; `Ok(None)` when it is not a deployable artifact
fn load_artifact(path: &Path) -> anyhow::Result<Option<Artifact>> {
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let Some(abi_value) = value.get("abi") else {
        return Ok(None); // not an artifact, skip silently
    };

    // hardhat: "bytecode": "0x…"; foundry: "bytecode": {"object": "0x…"}
    let bytecode_hex = match value.get("bytecode") {
        Some(serde_json::Value::String(hex)) => hex.as_str(),
        Some(serde_json::Value::Object(object)) => object
            .get("object")
            .and_then(|inner| inner.as_str())
            .unwrap_or(""),
        _ => "",
    };

    let stripped = bytecode_hex
        .strip_prefix("0x")
        .unwrap_or(bytecode_hex);
    if stripped.is_empty() {
        return Ok(None); // interface-only artifact, nothing to deploy
    }

    let abi: JsonAbi = serde_json::from_value(abi_value.clone())?;
    let bytecode = Bytes::from(hex::decode(stripped)?);

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("artifact")
        .to_string();

    Ok(Some(Artifact {
        name,
        abi,
        bytecode,
        path: path.to_path_buf(),
    }))
}

fn is_ignored_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| matches!(name, ".git" | "target" | "node_modules" | "dist" | "build"))
        .unwrap_or(false)
}
