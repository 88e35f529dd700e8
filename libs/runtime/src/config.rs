use anyhow::{Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::paths::resolve_home_dir;

const DEFAULT_SUBDIR: &str = ".coursehub";

/// Application configuration: strongly-typed server and logging sections
/// plus a per-module bag that each module deserializes on its own.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory containing per-module YAML files (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// module_name → raw module section.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub home_dir: String, // normalized to an absolute path on load
    pub host: String,
    pub port: u16,
    /// Per-request timeout; 0 disables it.
    #[serde(default)]
    pub timeout_sec: u64,
}

/// Maps subsystem names (tracing target prefixes) to their logging settings.
/// Key "default" is the catch-all for targets without their own section.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    pub file: String,          // "logs/coursehub.log"; empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("module '{module}' references undefined environment variable '{var}'")]
    MissingEnvVar { module: String, var: String },

    #[error("invalid configuration for module '{module}': {source}")]
    InvalidModuleConfig {
        module: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Empty => platform default (`$HOME/.coursehub`, `%APPDATA%/.coursehub`).
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8090,
            timeout_sec: 0,
        }
    }
}

pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/coursehub.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

/// Command line arguments relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
    pub mock: bool,
}

impl AppConfig {
    /// Layered loading: defaults → YAML file → `APP__*` environment variables.
    /// `server.home_dir` is normalized (and created) before returning.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // figment treats a missing file as empty
        if !config_path.as_ref().is_file() {
            anyhow::bail!("config file not found: {}", config_path.as_ref().display());
        }

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            server: ServerConfig::default(),
            logging: None,
            modules_dir: None,
            modules: HashMap::new(),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            // APP__SERVER__PORT=8090 maps to server.port
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .with_context(|| format!("failed to load {}", config_path.as_ref().display()))?;

        normalize_home_dir_inplace(&mut config.server)
            .context("failed to resolve server.home_dir")?;

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    /// Load from `config_path` when given, otherwise use defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.server)
                    .context("failed to resolve server.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config to YAML")
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }

    /// Typed view of a module section with `${VAR}` placeholders expanded
    /// from the process environment. `Ok(None)` when the section is absent.
    pub fn module_config<T: DeserializeOwned>(&self, module: &str) -> Result<Option<T>, ConfigError> {
        self.module_config_with(module, |name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::module_config`] with an explicit variable source.
    pub fn module_config_with<T, F>(&self, module: &str, lookup: F) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> Option<String>,
    {
        let Some(raw) = self.modules.get(module) else {
            return Ok(None);
        };
        let mut value = raw.clone();
        expand_env_placeholders(&mut value, &lookup).map_err(|var| ConfigError::MissingEnvVar {
            module: module.to_string(),
            var,
        })?;
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| ConfigError::InvalidModuleConfig {
                module: module.to_string(),
                source,
            })
    }
}

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Replaces every `${NAME}` inside string values. Returns the first
/// unresolvable variable name as the error.
fn expand_env_placeholders<F>(value: &mut serde_json::Value, lookup: &F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        serde_json::Value::String(s) => {
            if !ENV_PLACEHOLDER.is_match(s) {
                return Ok(());
            }
            let mut missing = None;
            let expanded = ENV_PLACEHOLDER.replace_all(s, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                lookup(name).unwrap_or_else(|| {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                })
            });
            if let Some(var) = missing {
                return Err(var);
            }
            let expanded = expanded.into_owned();
            *s = expanded;
            Ok(())
        }
        serde_json::Value::Array(items) => items
            .iter_mut()
            .try_for_each(|item| expand_env_placeholders(item, lookup)),
        serde_json::Value::Object(map) => map
            .values_mut()
            .try_for_each(|item| expand_env_placeholders(item, lookup)),
        _ => Ok(()),
    }
}

fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let configured = Some(server.home_dir.clone()).filter(|s| !s.trim().is_empty());
    let resolved: PathBuf = resolve_home_dir(configured, DEFAULT_SUBDIR, true)?;
    server.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_yaml {
            continue;
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid YAML in {}", path.display()))?;
        bag.insert(name.to_string(), serde_json::to_value(val)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn home_yaml(home: &Path) -> String {
        home.to_string_lossy().replace('\\', "/")
    }

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.server.home_dir, "");
        assert_eq!(config.server.timeout_sec, 0);

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "logs/coursehub.log");

        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_load_layered_parses_sections_and_normalizes_home_dir() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let home = tmp.path().join("home");

        let yaml = format!(
            r#"
server:
  home_dir: "{}"
  host: "0.0.0.0"
  port: 9090
  timeout_sec: 30

logging:
  default:
    console_level: debug
    file: "logs/default.log"

modules:
  profile_sync:
    default_role: teacher
"#,
            home_yaml(&home)
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(Path::new(&config.server.home_dir).is_absolute());
        assert!(home.is_dir(), "home_dir must be created on load");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.timeout_sec, 30);

        let def = &config.logging.as_ref().unwrap()["default"];
        assert_eq!(def.console_level, "debug");
        assert_eq!(def.file, "logs/default.log");

        assert_eq!(config.modules["profile_sync"]["default_role"], "teacher");
    }

    #[test]
    fn test_minimal_yaml_leaves_optional_sections_empty() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = format!(
            "server:\n  home_dir: \"{}\"\n  host: localhost\n  port: 8080\n",
            home_yaml(&tmp.path().join("minimal"))
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8080);
        assert!(config.logging.is_none());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_cli_verbose_levels() {
        for (verbose, expected) in [(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")] {
            let mut config = AppConfig::default();
            config.apply_cli_overrides(&CliArgs {
                port: Some(3000),
                verbose,
                ..Default::default()
            });

            assert_eq!(config.server.port, 3000);
            let default_section = &config.logging.as_ref().unwrap()["default"];
            assert_eq!(default_section.console_level, expected);
        }
    }

    #[test]
    fn test_modules_dir_files_are_merged_by_stem() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let modules_dir = tmp.path().join("modules");
        fs::create_dir_all(&modules_dir).unwrap();
        fs::write(
            modules_dir.join("profile_sync.yaml"),
            "default_role: admin\nretry:\n  max_attempts: 5\n",
        )
        .unwrap();
        fs::write(modules_dir.join("notes.txt"), "ignored").unwrap();

        let yaml = format!(
            r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 8090
modules_dir: "{}"
modules:
  other:
    key: value
"#,
            home_yaml(&tmp.path().join("home")),
            home_yaml(&modules_dir)
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(config.modules.contains_key("other"));
        assert!(!config.modules.contains_key("notes"));
        assert_eq!(config.modules["profile_sync"]["retry"]["max_attempts"], 5);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct StoreSection {
        token: String,
        dataset: String,
    }

    #[test]
    fn test_module_config_expands_env_placeholders() {
        let mut config = AppConfig::default();
        config.modules.insert(
            "store".into(),
            json!({ "token": "Bearer ${STORE_TOKEN}", "dataset": "production" }),
        );

        let section: StoreSection = config
            .module_config_with("store", |name| (name == "STORE_TOKEN").then(|| "s3cr3t".into()))
            .unwrap()
            .unwrap();

        assert_eq!(
            section,
            StoreSection {
                token: "Bearer s3cr3t".into(),
                dataset: "production".into()
            }
        );
    }

    #[test]
    fn test_module_config_reports_missing_env_var() {
        let mut config = AppConfig::default();
        config
            .modules
            .insert("store".into(), json!({ "token": "${NOPE}", "dataset": "d" }));

        let err = config
            .module_config_with::<StoreSection, _>("store", |_| None)
            .unwrap_err();

        match err {
            ConfigError::MissingEnvVar { module, var } => {
                assert_eq!(module, "store");
                assert_eq!(var, "NOPE");
            }
            other => panic!("expected MissingEnvVar, got {other:?}"),
        }
    }

    #[test]
    fn test_module_config_absent_and_invalid() {
        let mut config = AppConfig::default();
        assert!(config
            .module_config_with::<StoreSection, _>("store", |_| None)
            .unwrap()
            .is_none());

        config.modules.insert("store".into(), json!({ "token": 42 }));
        let err = config
            .module_config_with::<StoreSection, _>("store", |_| None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidModuleConfig { .. }));
    }

    #[test]
    fn test_to_yaml_roundtrip_basic() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("server:"));
        assert!(yaml.contains("logging:"));

        let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip.server.port, config.server.port);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = AppConfig::load_layered(tmp.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_invalid_yaml_missing_required_field() {
        let invalid_yaml = r#"
server:
  home_dir: "~/.test"
  port: 8090
"#;
        let result: Result<AppConfig, _> = serde_yaml::from_str(invalid_yaml);
        assert!(result.is_err());
    }
}
