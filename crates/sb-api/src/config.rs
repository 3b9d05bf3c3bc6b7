use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sb_core::{BundleError, ErrorKind, RecordSerializer};
use sb_marshal::{MarshalSerializer, StringEncoding};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_millis(1000);

/// The editor generation a project targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineFamily {
    #[default]
    #[serde(rename = "RMXP")]
    Rmxp,
    #[serde(rename = "RMVX")]
    Rmvx,
    #[serde(rename = "RMVXAce")]
    RmvxAce,
}

impl EngineFamily {
    pub const ALL: [EngineFamily; 3] = [Self::Rmxp, Self::Rmvx, Self::RmvxAce];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rmxp => "RMXP",
            Self::Rmvx => "RMVX",
            Self::RmvxAce => "RMVXAce",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn clipboard_format(self) -> &'static str {
        match self {
            Self::Rmxp => "RPGXP SCRIPT",
            Self::Rmvx => "RPGVX SCRIPT",
            Self::RmvxAce => "VX Ace SCRIPT",
        }
    }

    pub fn scripts_file_name(self) -> &'static str {
        match self {
            Self::Rmxp => "Scripts.rxdata",
            Self::Rmvx => "Scripts.rvdata",
            Self::RmvxAce => "Scripts.rvdata2",
        }
    }

    /// Container location relative to the project directory.
    pub fn scripts_path(self) -> PathBuf {
        Path::new("Data").join(self.scripts_file_name())
    }

    pub fn name_encoding(self) -> StringEncoding {
        match self {
            Self::RmvxAce => StringEncoding::Utf8Ivar,
            Self::Rmxp | Self::Rmvx => StringEncoding::Raw,
        }
    }

    pub fn from_scripts_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "rxdata" => Some(Self::Rmxp),
            "rvdata" => Some(Self::Rmvx),
            "rvdata2" => Some(Self::RmvxAce),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SessionOptions {
    pub engine: EngineFamily,
    /// Seed for key allocation; taken from the clock when absent.
    pub random_seed: Option<u32>,
    pub recovery_timeout: Duration,
    /// Overrides the engine's Marshal serializer.
    pub serializer: Option<Arc<dyn RecordSerializer>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::for_engine(EngineFamily::default())
    }
}

impl SessionOptions {
    pub fn for_engine(engine: EngineFamily) -> Self {
        Self {
            engine,
            random_seed: None,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
            serializer: None,
        }
    }

    pub(crate) fn resolve_serializer(&self) -> Arc<dyn RecordSerializer> {
        match &self.serializer {
            Some(serializer) => Arc::clone(serializer),
            None => Arc::new(MarshalSerializer::new(self.engine.name_encoding())),
        }
    }

    pub(crate) fn resolve_seed(&self) -> u32 {
        self.random_seed.unwrap_or_else(clock_seed)
    }
}

fn clock_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos() ^ (elapsed.as_secs() as u32))
        .unwrap_or(1)
}

/// Per-project settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub engine: Option<EngineFamily>,
    #[serde(default)]
    pub scripts_path: Option<PathBuf>,
    #[serde(default)]
    pub random_seed: Option<u32>,
    #[serde(default)]
    pub recovery_timeout_ms: Option<u64>,
}

impl ProjectConfig {
    pub fn session_options(&self) -> SessionOptions {
        let mut options = SessionOptions::for_engine(self.engine.unwrap_or_default());
        options.random_seed = self.random_seed;
        if let Some(timeout) = self.recovery_timeout_ms {
            options.recovery_timeout = Duration::from_millis(timeout);
        }
        options
    }
}

pub fn load_project_config(path: &Path) -> Result<ProjectConfig, BundleError> {
    if !path.exists() {
        return Err(BundleError::new(
            ErrorKind::StorageNotFound,
            format!("Config file does not exist: {}", path.display()),
        ));
    }
    let raw = fs::read_to_string(path).map_err(|error| {
        BundleError::new(
            ErrorKind::StorageRead,
            format!("Failed to read config {}: {}", path.display(), error),
        )
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        BundleError::new(
            ErrorKind::ConfigInvalid,
            format!("Config {} is invalid: {}", path.display(), error),
        )
    })
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn engine_family_maps_formats_and_files() {
        assert_eq!(EngineFamily::Rmvx.clipboard_format(), "RPGVX SCRIPT");
        assert_eq!(EngineFamily::RmvxAce.clipboard_format(), "VX Ace SCRIPT");
        assert_eq!(
            EngineFamily::Rmxp.scripts_path(),
            Path::new("Data").join("Scripts.rxdata")
        );
        assert_eq!(
            EngineFamily::from_scripts_path(Path::new("Game/Data/Scripts.RVDATA2")),
            Some(EngineFamily::RmvxAce)
        );
        assert_eq!(EngineFamily::from_scripts_path(Path::new("Scripts.bin")), None);
        assert_eq!(EngineFamily::parse("rmvx"), Some(EngineFamily::Rmvx));
        assert_eq!(EngineFamily::RmvxAce.name_encoding(), StringEncoding::Utf8Ivar);
    }

    #[test]
    fn project_config_reads_camel_case_json() {
        let config: ProjectConfig = serde_json::from_str(
            r#"{"engine":"RMVXAce","scriptsPath":"Data/Scripts.rvdata2","randomSeed":9,"recoveryTimeoutMs":250}"#,
        )
        .expect("config should parse");
        assert_eq!(config.engine, Some(EngineFamily::RmvxAce));
        let options = config.session_options();
        assert_eq!(options.engine, EngineFamily::RmvxAce);
        assert_eq!(options.random_seed, Some(9));
        assert_eq!(options.recovery_timeout, Duration::from_millis(250));

        let empty: ProjectConfig = serde_json::from_str("{}").expect("defaults");
        assert_eq!(empty.session_options().recovery_timeout, DEFAULT_RECOVERY_TIMEOUT);
    }

    #[test]
    fn load_project_config_reports_missing_and_invalid_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = load_project_config(&dir.path().join("none.json")).expect_err("missing");
        assert_eq!(missing.kind, ErrorKind::StorageNotFound);

        let path = dir.path().join("project.json");
        fs::write(&path, r#"{"engine":"RM2K"}"#).expect("write");
        let invalid = load_project_config(&path).expect_err("unknown engine");
        assert_eq!(invalid.kind, ErrorKind::ConfigInvalid);

        fs::write(&path, r#"{"engine":"RMVX"}"#).expect("write");
        let config = load_project_config(&path).expect("valid");
        assert_eq!(config.engine, Some(EngineFamily::Rmvx));
    }
}
