//! Runtime settings.
//!
//! Settings are read from an INI file:
//!
//! ```ini
//! [prefetch]
//! redirects_enabled = false
//! cacheable_duration_secs = 300
//! max_prerenders = 10
//!
//! [preloading]
//! config_file = holdback.json
//! log_level = info
//! ```
//!
//! Missing sections and keys fall back to the defaults. A relative
//! `config_file` is resolved against the directory of the settings file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use crate::config::PreloadingConfig;
use crate::error::ConfigError;

const PREFETCH_SECTION: &str = "prefetch";
const PRELOADING_SECTION: &str = "preloading";

/// Prefetch behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchSettings {
    /// Follow redirects while prefetching instead of failing.
    pub redirects_enabled: bool,

    /// How long a received prefetch stays servable.
    pub cacheable_duration: Duration,

    /// Maximum number of prerenders running at once.
    pub max_prerenders: usize,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            redirects_enabled: false,
            cacheable_duration: Duration::from_secs(300),
            max_prerenders: 10,
        }
    }
}

/// Where the holdback table lives and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadingSettings {
    /// JSON holdback and sampling table; none means an empty table.
    pub config_file: Option<PathBuf>,

    /// Default `tracing` filter directive.
    pub log_level: String,
}

impl Default for PreloadingSettings {
    fn default() -> Self {
        Self {
            config_file: None,
            log_level: "info".to_string(),
        }
    }
}

/// All runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub prefetch: PrefetchSettings,
    pub preloading: PreloadingSettings,
}

impl Settings {
    /// Load settings from an INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::parse(&contents, path)?;

        if let (Some(file), Some(dir)) = (&settings.preloading.config_file, path.parent()) {
            if file.is_relative() {
                settings.preloading.config_file = Some(dir.join(file));
            }
        }
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Parse settings from INI text.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, Path::new("<string>"))
    }

    fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Settings {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut settings = Self::default();

        if let Some(section) = ini.section(Some(PREFETCH_SECTION)) {
            let prefetch = &mut settings.prefetch;
            if let Some(value) = read::<BoolValue>(section, PREFETCH_SECTION, "redirects_enabled")? {
                prefetch.redirects_enabled = value.0;
            }
            if let Some(secs) = read::<u64>(section, PREFETCH_SECTION, "cacheable_duration_secs")? {
                prefetch.cacheable_duration = Duration::from_secs(secs);
            }
            if let Some(max) = read::<usize>(section, PREFETCH_SECTION, "max_prerenders")? {
                prefetch.max_prerenders = max;
            }
        }

        if let Some(section) = ini.section(Some(PRELOADING_SECTION)) {
            let preloading = &mut settings.preloading;
            if let Some(file) = section.get("config_file").filter(|v| !v.trim().is_empty()) {
                preloading.config_file = Some(PathBuf::from(file.trim()));
            }
            if let Some(level) = section.get("log_level").filter(|v| !v.trim().is_empty()) {
                preloading.log_level = level.trim().to_string();
            }
        }

        Ok(settings)
    }

    /// Load the holdback table named by `config_file`, or an empty one.
    pub fn load_preloading_config(&self) -> Result<PreloadingConfig, ConfigError> {
        match &self.preloading.config_file {
            Some(path) => PreloadingConfig::load(path),
            None => Ok(PreloadingConfig::new()),
        }
    }

    /// Enable or disable following redirects while prefetching.
    pub fn with_redirects_enabled(mut self, enabled: bool) -> Self {
        self.prefetch.redirects_enabled = enabled;
        self
    }

    /// Set how long a received prefetch stays servable.
    pub fn with_cacheable_duration(mut self, duration: Duration) -> Self {
        self.prefetch.cacheable_duration = duration;
        self
    }

    /// Set the maximum number of concurrent prerenders.
    pub fn with_max_prerenders(mut self, max: usize) -> Self {
        self.prefetch.max_prerenders = max;
        self
    }

    /// Set the holdback table file.
    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.preloading.config_file = Some(path);
        self
    }

    /// Set the default log filter.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.preloading.log_level = level.into();
        self
    }
}

/// Boolean accepting the usual INI spellings.
struct BoolValue(bool);

impl FromStr for BoolValue {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(BoolValue(true)),
            "false" | "no" | "off" | "0" => Ok(BoolValue(false)),
            _ => Err(()),
        }
    }
}

fn read<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = section.get(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key: format!("{}.{}", section_name, key),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.prefetch.redirects_enabled);
        assert_eq!(settings.prefetch.cacheable_duration, Duration::from_secs(300));
        assert_eq!(settings.prefetch.max_prerenders, 10);
        assert_eq!(settings.preloading.config_file, None);
        assert_eq!(settings.preloading.log_level, "info");
    }

    #[test]
    fn test_parse_all_keys() {
        let settings = Settings::from_ini_str(
            "[prefetch]\n\
             redirects_enabled = yes\n\
             cacheable_duration_secs = 60\n\
             max_prerenders = 2\n\
             [preloading]\n\
             config_file = /etc/preloading/holdback.json\n\
             log_level = debug\n",
        )
        .unwrap();

        assert!(settings.prefetch.redirects_enabled);
        assert_eq!(settings.prefetch.cacheable_duration, Duration::from_secs(60));
        assert_eq!(settings.prefetch.max_prerenders, 2);
        assert_eq!(
            settings.preloading.config_file,
            Some(PathBuf::from("/etc/preloading/holdback.json"))
        );
        assert_eq!(settings.preloading.log_level, "debug");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let settings = Settings::from_ini_str("[unrelated]\nkey = value\n").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_value_names_key() {
        let err = Settings::from_ini_str("[prefetch]\nmax_prerenders = many\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, "prefetch.max_prerenders");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_builder_overrides() {
        let settings = Settings::default()
            .with_redirects_enabled(true)
            .with_cacheable_duration(Duration::from_secs(5))
            .with_max_prerenders(1)
            .with_config_file(PathBuf::from("table.json"))
            .with_log_level("trace");

        assert!(settings.prefetch.redirects_enabled);
        assert_eq!(settings.prefetch.cacheable_duration, Duration::from_secs(5));
        assert_eq!(settings.prefetch.max_prerenders, 1);
        assert_eq!(settings.preloading.config_file, Some(PathBuf::from("table.json")));
        assert_eq!(settings.preloading.log_level, "trace");
    }

    #[test]
    fn test_load_resolves_relative_config_file() {
        let dir = TempDir::new().unwrap();
        let table_path = dir.path().join("holdback.json");
        std::fs::write(
            &table_path,
            r#"[{"preloading_type":"Prefetch","preloading_predictor":"SpeculationRules","holdback":true}]"#,
        )
        .unwrap();

        let settings_path = dir.path().join("preloading.ini");
        let mut file = std::fs::File::create(&settings_path).unwrap();
        writeln!(file, "[preloading]").unwrap();
        writeln!(file, "config_file = holdback.json").unwrap();
        drop(file);

        let settings = Settings::load(&settings_path).unwrap();
        assert_eq!(settings.preloading.config_file, Some(table_path));

        let config = settings.load_preloading_config().unwrap();
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_no_config_file_gives_empty_table() {
        let config = Settings::default().load_preloading_config().unwrap();
        assert!(config.is_empty());
    }
}
