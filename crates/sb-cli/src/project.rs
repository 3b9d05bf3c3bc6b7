use std::path::{Path, PathBuf};

use sb_api::{
    load_project_config, BundleError, DetachedSurface, EngineFamily, FileStorage, MemoryDisplay,
    ProjectConfig, ScriptBundleSession, SessionOptions,
};

use crate::invalid_argument;

pub(crate) type CliSession = ScriptBundleSession<MemoryDisplay>;

/// The container a command works on and how to read it.
#[derive(Clone)]
pub(crate) struct Project {
    pub(crate) path: PathBuf,
    pub(crate) options: SessionOptions,
}

pub(crate) fn resolve_project(
    file: Option<&str>,
    engine: Option<&str>,
    config_path: Option<&str>,
) -> Result<Project, BundleError> {
    let config = match config_path {
        Some(raw) => Some(load_project_config(Path::new(raw))?),
        None => None,
    };
    let path = resolve_container_path(file, config_path, config.as_ref())?;
    let mut options = config
        .as_ref()
        .map(ProjectConfig::session_options)
        .unwrap_or_default();
    options.engine = resolve_engine(&path, engine, config.as_ref().and_then(|c| c.engine))?;
    log::debug!(
        "container {} as {}",
        path.display(),
        options.engine.as_str()
    );
    Ok(Project { path, options })
}

/// An explicit `--engine` wins, then the container extension, then the config.
pub(crate) fn resolve_engine(
    path: &Path,
    explicit: Option<&str>,
    configured: Option<EngineFamily>,
) -> Result<EngineFamily, BundleError> {
    if let Some(raw) = explicit {
        return EngineFamily::parse(raw)
            .ok_or_else(|| invalid_argument(format!("Unknown engine family: {}", raw)));
    }
    Ok(EngineFamily::from_scripts_path(path)
        .or(configured)
        .unwrap_or_default())
}

/// Relative `scriptsPath` entries are resolved against the config file's directory.
pub(crate) fn resolve_container_path(
    file: Option<&str>,
    config_path: Option<&str>,
    config: Option<&ProjectConfig>,
) -> Result<PathBuf, BundleError> {
    if let Some(file) = file {
        return Ok(PathBuf::from(file));
    }
    let configured = config
        .and_then(|config| config.scripts_path.clone())
        .ok_or_else(|| invalid_argument("No --file given and no scriptsPath configured."))?;
    if configured.is_absolute() {
        return Ok(configured);
    }
    let base = config_path
        .and_then(|raw| Path::new(raw).parent())
        .unwrap_or_else(|| Path::new(""));
    Ok(base.join(configured))
}

pub(crate) fn open_session(project: &Project) -> Result<CliSession, BundleError> {
    ScriptBundleSession::load(
        &FileStorage,
        &project.path,
        MemoryDisplay::new(),
        project.options.clone(),
    )
}

pub(crate) fn save_session(session: &mut CliSession, project: &Project) -> Result<(), BundleError> {
    session.save(&mut DetachedSurface, &mut FileStorage, &project.path)
}

#[cfg(test)]
mod project_tests {
    use super::*;
    use sb_api::ErrorKind;
    use std::fs;

    #[test]
    fn engine_prefers_flag_then_extension_then_config() {
        let ace = Path::new("Data/Scripts.rvdata2");
        let bare = Path::new("scripts.bin");
        assert_eq!(
            resolve_engine(ace, Some("rmxp"), None).expect("flag"),
            EngineFamily::Rmxp
        );
        assert_eq!(
            resolve_engine(ace, None, Some(EngineFamily::Rmvx)).expect("extension"),
            EngineFamily::RmvxAce
        );
        assert_eq!(
            resolve_engine(bare, None, Some(EngineFamily::Rmvx)).expect("config"),
            EngineFamily::Rmvx
        );
        assert_eq!(
            resolve_engine(bare, None, None).expect("default"),
            EngineFamily::Rmxp
        );
        let error = resolve_engine(bare, Some("RM2K"), None).expect_err("unknown");
        assert_eq!(error.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn container_path_falls_back_to_config_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("project.json");
        fs::write(
            &config_path,
            r#"{"engine":"RMVX","scriptsPath":"Data/Scripts.rvdata","randomSeed":4}"#,
        )
        .expect("write config");
        let config_raw = config_path.to_string_lossy().to_string();

        let project = resolve_project(None, None, Some(&config_raw)).expect("project");
        assert_eq!(project.path, dir.path().join("Data/Scripts.rvdata"));
        assert_eq!(project.options.engine, EngineFamily::Rmvx);
        assert_eq!(project.options.random_seed, Some(4));

        let explicit =
            resolve_project(Some("other.rxdata"), None, Some(&config_raw)).expect("explicit");
        assert_eq!(explicit.path, PathBuf::from("other.rxdata"));
        assert_eq!(explicit.options.engine, EngineFamily::Rmxp);

        let error = resolve_project(None, None, None)
            .err()
            .expect("nothing to open");
        assert_eq!(error.kind, ErrorKind::InvalidArgument);
    }
}
