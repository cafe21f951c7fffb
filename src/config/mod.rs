use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::ChainDescriptor;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Default JSON-RPC endpoint for the wallet binding
    pub rpc: Option<String>,

    /// Directory holding compiled {abi, bytecode} artifacts
    pub artifacts_dir: Option<String>,

    /// Override for the registry document location
    pub registry_path: Option<String>,

    /// Override for the donation recipient
    pub donation_recipient: Option<String>,

    /// Extra chains merged over the built-in catalog
    #[serde(default)]
    pub chains: Vec<ChainDescriptor>,
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    toml::from_str::<Config>(&content).unwrap_or_default()
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("CONJURE_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("conjure").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("conjure").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "conjure", "conjure")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("conjure"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("conjure"));
    }
    directories::ProjectDirs::from("io", "conjure", "conjure")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Where the contract registry document lives
pub fn registry_path(config: &Config) -> Option<PathBuf> {
    if let Some(path) = &config.registry_path {
        return Some(PathBuf::from(path));
    }
    data_dir().map(|dir| dir.join("contracts.json"))
}
