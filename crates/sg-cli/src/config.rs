//! Settings for the `sg` binary.
//!
//! Later layers win:
//!
//! 1. built-in defaults (database under the platform data directory)
//! 2. `config.toml` in the platform config directory, e.g. `~/.config/sg/`
//! 3. the file given with `--config`
//! 4. `SG_DATABASE_PATH` and `SG_TIMEOUT_SECS`
//!
//! Missing files are skipped silently.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "sg";

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file holding the name directory and recorded sessions.
    pub database_path: PathBuf,
    /// Deadline applied to `sg graph` when `--timeout` is not given.
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::data_dir().map_or_else(|| PathBuf::from("."), |dir| dir.join(APP_DIR));
        Self {
            database_path: base.join("sg.db"),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Resolves every layer, with `explicit` as the `--config` file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(explicit: Option<&Path>) -> Result<Self, figment::Error> {
        Self::layers(dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml")), explicit)
            .extract()
    }

    fn layers(user_file: Option<PathBuf>, explicit: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment = match user_file {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        };
        let figment = match explicit {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        };
        figment.merge(Env::prefixed("SG_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_database_lives_in_data_dir() {
        let config = Config::default();
        let expected = dirs::data_dir().unwrap().join("sg").join("sg.db");
        assert_eq!(config.database_path, expected);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn explicit_file_beats_user_file() {
        let temp = tempfile::tempdir().unwrap();
        let user = temp.path().join("user.toml");
        let explicit = temp.path().join("explicit.toml");
        std::fs::write(&user, "database_path = \"/srv/user.db\"\ntimeout_secs = 30\n").unwrap();
        std::fs::write(&explicit, "database_path = \"/srv/poker.db\"\n").unwrap();

        let config: Config = Config::layers(Some(user), Some(&explicit))
            .extract()
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/poker.db"));
        assert_eq!(config.timeout_secs, Some(30));
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config: Config = Config::layers(
            Some(temp.path().join("absent.toml")),
            Some(&temp.path().join("also-absent.toml")),
        )
        .extract()
        .unwrap();
        assert_eq!(config.database_path, Config::default().database_path);
    }

    #[test]
    fn debug_lists_fields() {
        let config = Config {
            database_path: PathBuf::from("/data/sg.db"),
            timeout_secs: Some(5),
        };
        assert_eq!(
            format!("{config:?}"),
            "Config { database_path: \"/data/sg.db\", timeout_secs: Some(5) }"
        );
    }
}
