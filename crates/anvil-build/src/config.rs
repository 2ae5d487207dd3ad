use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::manifest::DEFAULT_TARGET;

pub const CONFIG_FILE: &str = "anvil-config.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Configuration {
    #[default]
    Debug,
    Release,
}

impl Configuration {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "release" => Some(Self::Release),
            _ => None,
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the executor should compare file signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileSystemMode {
    #[default]
    DeviceAgnostic,
    Default,
}

impl FileSystemMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceAgnostic => "device-agnostic",
            Self::Default => "default",
        }
    }
}

/// The `client` section of a rendered manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub name: String,
    pub file_system: FileSystemMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "basic".to_string(),
            file_system: FileSystemMode::default(),
        }
    }
}

/// Values injected into planning. Toolchain locations only ever come from
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    pub compiler: PathBuf,
    pub linker: PathBuf,
    pub codesign: PathBuf,
    pub build_dir: PathBuf,
    pub configuration: Configuration,
    pub debug_entitlements: bool,
    pub file_system: FileSystemMode,
    pub default_target: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("anvilc"),
            linker: PathBuf::from("cc"),
            codesign: PathBuf::from("codesign"),
            build_dir: PathBuf::from(".build"),
            configuration: Configuration::default(),
            debug_entitlements: false,
            file_system: FileSystemMode::default(),
            default_target: DEFAULT_TARGET.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    build: BuildConfig,
}

impl BuildConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(input).context("failed to parse build config")?;
        let config = file.build;
        if config.default_target.trim().is_empty() {
            return Err(anyhow!("build.default-target must not be empty"));
        }
        if config.compiler.as_os_str().is_empty() {
            return Err(anyhow!("build.compiler must not be empty"));
        }
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read build config: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse build config: {}", path.display()))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.build_dir.join(self.configuration.as_str())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.build_dir
            .join(format!("{}.yaml", self.configuration.as_str()))
    }

    pub fn client(&self) -> ClientConfig {
        ClientConfig {
            file_system: self.file_system,
            ..ClientConfig::default()
        }
    }

    pub fn applies_entitlements(&self) -> bool {
        self.debug_entitlements && self.configuration == Configuration::Debug
    }
}
