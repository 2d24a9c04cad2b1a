use crate::utils::error::{FocusError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_CONFIG_FILE: &str = "focus-tracker.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub database: DatabaseConfig,
    pub monitor: MonitorConfig,
    pub analyzer: AnalyzerConfig,
    pub files: FilesConfig,
    pub browser: BrowserConfig,
    pub network: NetworkConfig,
    pub setup: SetupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "focus_tracker.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    /// 計算專注度與警示用的最近活動數量
    pub recent_window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            error_backoff_secs: 5,
            recent_window: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub ollama_url: String,
    pub model: String,
    pub status_timeout_secs: u64,
    pub temperature: f64,
    pub keyword_tokens: u32,
    pub classify_tokens: u32,
    pub min_keywords: usize,
    pub max_keywords: usize,
    /// 標題出現這些字時額外加分
    pub project_terms: Vec<String>,
    pub distraction_domains: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            status_timeout_secs: 3,
            temperature: 0.2,
            keyword_tokens: 500,
            classify_tokens: 200,
            min_keywords: 20,
            max_keywords: 50,
            project_terms: vec!["focus-tracker".to_string(), "focus_tracker".to_string()],
            distraction_domains: [
                "facebook.com",
                "twitter.com",
                "instagram.com",
                "tiktok.com",
                "reddit.com",
                "netflix.com",
                "twitch.tv",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// 空的話使用家目錄下的 Documents、Desktop、Downloads 與目前目錄
    pub watch_paths: Vec<PathBuf>,
    pub ignored_extensions: Vec<String>,
    pub cooldown_ms: u64,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            watch_paths: Vec::new(),
            ignored_extensions: ["tmp", "log", "swp", "lock"]
                .into_iter()
                .map(String::from)
                .collect(),
            cooldown_ms: 1000,
        }
    }
}

impl FilesConfig {
    pub fn resolved_watch_paths(&self) -> Vec<PathBuf> {
        if !self.watch_paths.is_empty() {
            return self.watch_paths.clone();
        }

        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            for name in ["Documents", "Desktop", "Downloads"] {
                paths.push(home.join(name));
            }
        }
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        paths
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub interval_secs: u64,
    pub query_limit: usize,
    pub display_limit: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            query_limit: 50,
            display_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    pub pip_packages: Vec<String>,
    pub native_packages: Vec<String>,
    pub use_sudo: bool,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            pip_packages: Vec::new(),
            native_packages: vec!["xdotool".to_string()],
            use_sudo: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
        }
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"))
}

impl TrackerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時回傳預設配置
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| FocusError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OLLAMA_HOST})，未定義的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("database.path", &self.database.path)?;

        validation::validate_positive_number(
            "monitor.poll_interval_secs",
            self.monitor.poll_interval_secs,
            1,
        )?;
        validation::validate_positive_number(
            "monitor.error_backoff_secs",
            self.monitor.error_backoff_secs,
            1,
        )?;
        validation::validate_positive_number("monitor.recent_window", self.monitor.recent_window, 7)?;

        validation::validate_url("analyzer.ollama_url", &self.analyzer.ollama_url)?;
        validation::validate_non_empty_string("analyzer.model", &self.analyzer.model)?;
        validation::validate_range("analyzer.temperature", self.analyzer.temperature, 0.0, 2.0)?;
        validation::validate_positive_number(
            "analyzer.max_keywords",
            self.analyzer.max_keywords,
            1,
        )?;
        if self.analyzer.min_keywords > self.analyzer.max_keywords {
            return Err(FocusError::InvalidConfigValueError {
                field: "analyzer.min_keywords".to_string(),
                value: self.analyzer.min_keywords.to_string(),
                reason: format!(
                    "Must not exceed analyzer.max_keywords ({})",
                    self.analyzer.max_keywords
                ),
            });
        }

        validation::validate_positive_number("browser.interval_secs", self.browser.interval_secs, 1)?;
        validation::validate_positive_number("browser.query_limit", self.browser.query_limit, 1)?;
        validation::validate_positive_number(
            "network.poll_interval_secs",
            self.network.poll_interval_secs,
            1,
        )?;

        validation::validate_package_names("setup.pip_packages", &self.setup.pip_packages)?;
        validation::validate_package_names("setup.native_packages", &self.setup.native_packages)?;

        let valid_formats = ["compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(FocusError::InvalidConfigValueError {
                field: "logging.format".to_string(),
                value: self.logging.format.clone(),
                reason: format!("Valid formats: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}

impl Validate for TrackerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();

        assert_eq!(config.database.path, "focus_tracker.db");
        assert_eq!(config.monitor.poll_interval_secs, 2);
        assert_eq!(config.analyzer.model, "mistral");
        assert_eq!(config.browser.interval_secs, 30);
        assert_eq!(config.setup.native_packages, vec!["xdotool".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml_content = r#"
[analyzer]
model = "llama3"
project_terms = ["thesis"]

[files]
watch_paths = ["/tmp/notes"]
cooldown_ms = 250

[setup]
pip_packages = ["requests"]
use_sudo = false
"#;

        let config = TrackerConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.analyzer.model, "llama3");
        assert_eq!(config.analyzer.project_terms, vec!["thesis".to_string()]);
        assert_eq!(config.analyzer.ollama_url, "http://localhost:11434");
        assert_eq!(config.files.resolved_watch_paths(), vec![PathBuf::from("/tmp/notes")]);
        assert_eq!(config.files.cooldown_ms, 250);
        assert!(!config.setup.use_sudo);
        assert_eq!(config.setup.native_packages, vec!["xdotool".to_string()]);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("FOCUS_TRACKER_TEST_OLLAMA", "http://10.0.0.5:11434");

        let toml_content = r#"
[analyzer]
ollama_url = "${FOCUS_TRACKER_TEST_OLLAMA}"
model = "${FOCUS_TRACKER_TEST_UNDEFINED}"
"#;

        let config = TrackerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.analyzer.ollama_url, "http://10.0.0.5:11434");
        assert_eq!(config.analyzer.model, "${FOCUS_TRACKER_TEST_UNDEFINED}");

        std::env::remove_var("FOCUS_TRACKER_TEST_OLLAMA");
    }

    #[test]
    fn test_config_validation() {
        let config = TrackerConfig::from_toml_str(
            r#"
[monitor]
poll_interval_secs = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TrackerConfig::from_toml_str(
            r#"
[analyzer]
min_keywords = 60
max_keywords = 50
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TrackerConfig::from_toml_str(
            r#"
[logging]
format = "pretty"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TrackerConfig::from_toml_str("[monitor\npoll = 1").unwrap_err();
        assert!(matches!(err, FocusError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"/tmp/focus-test.db\"").unwrap();

        let config = TrackerConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.database.path, "/tmp/focus-test.db");

        let config = TrackerConfig::load_or_default("/nonexistent/focus-tracker.toml").unwrap();
        assert_eq!(config.database.path, "focus_tracker.db");
    }
}
