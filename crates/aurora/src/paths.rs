use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use auroraconfig::AuroraConfig;
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "AURORA_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "aurora.toml";

const QUALIFIER: &str = "site";
const ORGANISATION: &str = "Aurora";
const APPLICATION: &str = "aurora";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    overridden: bool,
}

/// Which file configuration is read from, and whether the user named it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Passed with `--config`; it must exist.
    Explicit(PathBuf),
    /// The discovered default; a missing file means built-in defaults.
    Default(PathBuf),
}

impl ConfigLocation {
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) | Self::Default(path) => path,
        }
    }

    pub fn load(&self) -> Result<AuroraConfig> {
        match self {
            Self::Explicit(path) => AuroraConfig::load(path)
                .with_context(|| format!("failed to load configuration {}", path.display())),
            Self::Default(path) => AuroraConfig::load_or_default(path)
                .with_context(|| format!("failed to load configuration {}", path.display())),
        }
    }
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self {
                config_dir,
                overridden: true,
            });
        }

        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
            overridden: false,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Whether the config directory came from `AURORA_CONFIG_DIR`.
    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn locate_config(&self, flag: Option<&Path>) -> ConfigLocation {
        match flag {
            Some(path) => ConfigLocation::Explicit(path.to_path_buf()),
            None => ConfigLocation::Default(self.config_file()),
        }
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self {
            config_dir,
            overridden: true,
        }
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        fn clear(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_override_takes_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, root.path());

        let paths = AppPaths::discover().unwrap();

        assert!(paths.is_overridden());
        assert_eq!(paths.config_dir(), root.path());
        assert_eq!(paths.config_file(), root.path().join("aurora.toml"));
    }

    #[test]
    fn falls_back_to_platform_directory() {
        let _guard = env_lock().lock().unwrap();
        let _config_guard = EnvGuard::clear(ENV_CONFIG_DIR);

        if let Ok(paths) = AppPaths::discover() {
            assert!(!paths.is_overridden());
            assert!(paths.config_file().ends_with(CONFIG_FILE_NAME));
        }
    }

    #[test]
    fn flag_wins_over_discovered_file() {
        let paths = AppPaths::from_raw(PathBuf::from("/etc/aurora"));
        assert_eq!(
            paths.locate_config(Some(Path::new("custom.toml"))),
            ConfigLocation::Explicit(PathBuf::from("custom.toml"))
        );
        assert_eq!(
            paths.locate_config(None),
            ConfigLocation::Default(PathBuf::from("/etc/aurora/aurora.toml"))
        );
    }

    #[test]
    fn missing_default_file_loads_defaults() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let config = paths.locate_config(None).load().unwrap();
        assert_eq!(config, AuroraConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let missing = root.path().join("nope.toml");
        assert!(paths.locate_config(Some(&missing)).load().is_err());
    }

    #[test]
    fn default_file_is_parsed_when_present() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(CONFIG_FILE_NAME),
            "version = 1\n[window]\ntitle = \"Lobby\"\n",
        )
        .unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let config = paths.locate_config(None).load().unwrap();
        assert_eq!(config.window.title, "Lobby");
    }
}
