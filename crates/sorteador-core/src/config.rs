// Configuration loading and parsing (config/sorteador.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::bulk::DEFAULT_EXPORT_FILE;
use crate::db::DEFAULT_ROSTER_KEY;
use crate::draw::{TeamCount, MAX_TEAMS, MIN_TEAMS};
use crate::roster::{RosterLimits, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_NAME_LEN};

/// Name of the config file inside `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "sorteador.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub roster: RosterLimits,
    pub default_teams: TeamCount,
    pub autosave_interval: Duration,
    pub notice_ttl: Duration,
    /// SQLite database path. Empty means the platform data directory.
    pub db_path: String,
    pub storage_key: String,
    pub export_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            roster: RosterLimits::default(),
            default_teams: TeamCount::default(),
            autosave_interval: Duration::from_secs(30),
            notice_ttl: Duration::from_millis(3000),
            db_path: "sorteador.db".to_string(),
            storage_key: DEFAULT_ROSTER_KEY.to_string(),
            export_file: DEFAULT_EXPORT_FILE.to_string(),
        }
    }
}

impl Config {
    /// Where the database lives. An empty `db_path` resolves to
    /// `<data dir>/sorteador.db`, falling back to the working directory when
    /// the platform has no home directory.
    pub fn resolve_db_path(&self) -> PathBuf {
        if !self.db_path.is_empty() {
            return PathBuf::from(&self.db_path);
        }
        match directories::ProjectDirs::from("", "", "sorteador") {
            Some(dirs) => dirs.data_dir().join("sorteador.db"),
            None => PathBuf::from("sorteador.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// sorteador.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the whole file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    roster: RosterLimits,
    draw: DrawSection,
    autosave: AutosaveSection,
    notifications: NotificationsSection,
    storage: StorageSection,
    export: ExportSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DrawSection {
    default_teams: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct AutosaveSection {
    interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct NotificationsSection {
    ttl_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct StorageSection {
    #[serde(default)]
    db_path: String,
    key: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportSection {
    file_name: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/sorteador.toml` relative to
/// `base_dir`.
///
/// This does not copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    validate(&file)?;

    Ok(Config {
        roster: file.roster,
        default_teams: TeamCount::clamped(file.draw.default_teams),
        autosave_interval: Duration::from_secs(file.autosave.interval_secs),
        notice_ttl: Duration::from_millis(file.notifications.ttl_ms),
        db_path: file.storage.db_path,
        storage_key: file.storage.key,
        export_file: file.export.file_name,
    })
}

/// Create `config/sorteador.toml` from `defaults/sorteador.toml` if it is
/// missing. Returns the path written, or `None` when the config already
/// existed. An existing config is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/{CONFIG_FILE} and no defaults/{CONFIG_FILE} in {}",
                base_dir.display()
            ),
        });
    }

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    })?;

    Ok(Some(target))
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Copies the default config first if none exists yet.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(file: &ConfigFile) -> Result<(), ConfigError> {
    let positive: &[(&str, u64)] = &[
        ("roster.max_entries", file.roster.max_entries as u64),
        ("roster.max_name_len", file.roster.max_name_len as u64),
        ("autosave.interval_secs", file.autosave.interval_secs),
        ("notifications.ttl_ms", file.notifications.ttl_ms),
    ];
    for (name, val) in positive {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    let ceilings: &[(&str, usize, usize)] = &[
        ("roster.max_entries", file.roster.max_entries, DEFAULT_MAX_ENTRIES),
        ("roster.max_name_len", file.roster.max_name_len, DEFAULT_MAX_NAME_LEN),
    ];
    for (name, val, max) in ceilings {
        if val > max {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be at most {max}, got {val}"),
            });
        }
    }

    let teams = file.draw.default_teams;
    if !(MIN_TEAMS..=MAX_TEAMS).contains(&teams) {
        return Err(ConfigError::ValidationError {
            field: "draw.default_teams".into(),
            message: format!("must be between {MIN_TEAMS} and {MAX_TEAMS} inclusive, got {teams}"),
        });
    }

    let non_empty: &[(&str, &str)] = &[
        ("storage.key", file.storage.key.as_str()),
        ("export.file_name", file.export.file_name.as_str()),
    ];
    for (name, val) in non_empty {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: the workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .ancestors()
            .find(|dir| dir.join("defaults").join(CONFIG_FILE).exists())
            .map(Path::to_path_buf)
            .expect("defaults/sorteador.toml should exist above the crate")
    }

    fn default_text() -> String {
        fs::read_to_string(project_root().join("defaults").join(CONFIG_FILE)).unwrap()
    }

    /// Helper: temp dir with config/sorteador.toml holding `text`.
    fn config_dir_with(name: &str, text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), text).unwrap();
        tmp
    }

    fn expect_field(err: ConfigError, expected: &str) {
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn default_file_matches_default_config() {
        let tmp = config_dir_with("sorteador_config_defaults", &default_text());
        let config = load_config_from(&tmp).expect("should load default config");

        assert_eq!(config, Config::default());
        assert_eq!(config.roster.max_entries, 100);
        assert_eq!(config.roster.max_name_len, 50);
        assert_eq!(config.default_teams.get(), 2);
        assert_eq!(config.autosave_interval, Duration::from_secs(30));
        assert_eq!(config.notice_ttl, Duration::from_millis(3000));
        assert_eq!(config.storage_key, "sorteador-pessoas");
        assert_eq!(config.export_file, "lista-pessoas.txt");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_max_entries() {
        let text = default_text().replace("max_entries = 100", "max_entries = 0");
        let tmp = config_dir_with("sorteador_config_zero_entries", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "roster.max_entries");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_name_length() {
        let text = default_text().replace("max_name_len = 50", "max_name_len = 0");
        let tmp = config_dir_with("sorteador_config_zero_len", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "roster.max_name_len");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_max_entries_above_100() {
        let text = default_text().replace("max_entries = 100", "max_entries = 500");
        let tmp = config_dir_with("sorteador_config_many_entries", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "roster.max_entries");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_name_len_above_50() {
        let text = default_text().replace("max_name_len = 50", "max_name_len = 400");
        let tmp = config_dir_with("sorteador_config_long_names", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "roster.max_name_len");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn accepts_tighter_limits() {
        let text = default_text()
            .replace("max_entries = 100", "max_entries = 20")
            .replace("max_name_len = 50", "max_name_len = 30");
        let tmp = config_dir_with("sorteador_config_tight", &text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.roster.max_entries, 20);
        assert_eq!(config.roster.max_name_len, 30);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_default_teams_out_of_range() {
        for bad in ["1", "11"] {
            let text = default_text().replace("default_teams = 2", &format!("default_teams = {bad}"));
            let tmp = config_dir_with("sorteador_config_teams", &text);
            expect_field(load_config_from(&tmp).unwrap_err(), "draw.default_teams");
            let _ = fs::remove_dir_all(&tmp);
        }
    }

    #[test]
    fn rejects_zero_autosave_interval() {
        let text = default_text().replace("interval_secs = 30", "interval_secs = 0");
        let tmp = config_dir_with("sorteador_config_autosave", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "autosave.interval_secs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_blank_storage_key() {
        let text = default_text().replace("key = \"sorteador-pessoas\"", "key = \"  \"");
        let tmp = config_dir_with("sorteador_config_key", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "storage.key");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_db_path_means_data_dir() {
        let text = default_text().replace("db_path = \"sorteador.db\"\n", "");
        let tmp = config_dir_with("sorteador_config_no_db_path", &text);
        let config = load_config_from(&tmp).unwrap();
        assert!(config.db_path.is_empty());
        assert!(config.resolve_db_path().ends_with("sorteador.db"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_db_path_is_used_as_is() {
        let config = Config {
            db_path: "/tmp/x.db".into(),
            ..Config::default()
        };
        assert_eq!(config.resolve_db_path(), PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn file_not_found_for_missing_config() {
        let tmp = std::env::temp_dir().join("sorteador_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = config_dir_with("sorteador_config_invalid", "this is not valid [[[ toml");
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_copies_default() {
        let tmp = std::env::temp_dir().join("sorteador_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), default_text()).unwrap();

        let written = ensure_config_file(&tmp).unwrap();
        assert_eq!(written, Some(tmp.join("config").join(CONFIG_FILE)));
        assert_eq!(load_config_from(&tmp).unwrap(), Config::default());

        // Second call finds the file and leaves it alone.
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_keeps_existing() {
        let tmp = std::env::temp_dir().join("sorteador_config_ensure_keeps");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), default_text()).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), "# custom\n").unwrap();

        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        let content = fs::read_to_string(tmp.join("config").join(CONFIG_FILE)).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_without_defaults_is_an_error() {
        let tmp = std::env::temp_dir().join("sorteador_config_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_file(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("no defaults/sorteador.toml"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
        assert!(!tmp.join("config").exists());

        let _ = fs::remove_dir_all(&tmp);
    }
}
