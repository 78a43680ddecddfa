/// Configuration system for depgraph-timeline
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::build::BuildEnvironment;
use crate::error::{ConfigError, TimelineError};
use chrono::{DateTime, NaiveDate, Utc};
use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Repository and walk selection
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// External build configuration
    #[serde(default)]
    pub build: BuildConfig,

    /// Contributor-history configuration
    #[serde(default)]
    pub contributors: ContributorsConfig,

    /// Timeline output configuration
    #[serde(default)]
    pub timeline: TimelineConfig,
}

/// Repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Working tree to walk (checked out and rebuilt in place)
    #[serde(default = "default_repo_path")]
    pub path: PathBuf,

    /// Hosting owner (user or organization)
    #[serde(default)]
    pub owner: String,

    /// Hosting repository name
    #[serde(default)]
    pub name: String,

    /// Branch whose history is walked
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Only commits touching one of these globs are walked (empty = all commits)
    #[serde(default = "default_source_paths")]
    pub source_paths: Vec<String>,

    /// Start date, `YYYY-MM-DD` or RFC 3339
    #[serde(default)]
    pub since: Option<String>,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Program run in the working tree for every commit
    #[serde(default = "default_build_program")]
    pub program: String,

    /// Arguments passed to the program
    #[serde(default = "default_build_args")]
    pub args: Vec<String>,

    /// Generated file holding the graph, relative to the working tree
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    /// Regex locating the embedded graph; capture group 1 is the graph text
    #[serde(default = "default_graph_pattern")]
    pub graph_pattern: String,

    /// Also delete ignored files on checkout
    #[serde(default)]
    pub clean_ignored: bool,

    /// Environment given to the build process
    #[serde(default)]
    pub environment: BuildEnvironment,
}

/// Contributor-history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorsConfig {
    /// History source: "github" or "git"
    #[serde(default = "default_contributor_source")]
    pub source: String,

    /// GraphQL endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Commits requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Timeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Page title
    #[serde(default = "default_title")]
    pub title: String,

    /// Graph transition duration in milliseconds
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,

    /// Time each snapshot stays on screen after its transition, in milliseconds
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,

    /// Output HTML file
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

// Default value functions
fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_source_paths() -> Vec<String> {
    vec!["blueprint/**".to_string()]
}

fn default_build_program() -> String {
    "leanblueprint".to_string()
}

fn default_build_args() -> Vec<String> {
    vec!["web".to_string()]
}

fn default_output_file() -> PathBuf {
    PathBuf::from("blueprint/web/dep_graph_document.html")
}

fn default_graph_pattern() -> String {
    r"(?s)renderDot\(\s*`(.*?)`\s*\)".to_string()
}

fn default_contributor_source() -> String {
    "github".to_string()
}

fn default_api_url() -> String {
    crate::contributors::GITHUB_GRAPHQL_URL.to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_title() -> String {
    "Dependency graph history".to_string()
}

fn default_transition_ms() -> u64 {
    1000
}

fn default_hold_ms() -> u64 {
    500
}

fn default_output() -> PathBuf {
    PathBuf::from("timeline.html")
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
            owner: String::new(),
            name: String::new(),
            branch: default_branch(),
            source_paths: default_source_paths(),
            since: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: default_build_program(),
            args: default_build_args(),
            output_file: default_output_file(),
            graph_pattern: default_graph_pattern(),
            clean_ignored: false,
            environment: BuildEnvironment::default(),
        }
    }
}

impl Default for ContributorsConfig {
    fn default() -> Self {
        Self {
            source: default_contributor_source(),
            api_url: default_api_url(),
            token_env: default_token_env(),
            page_size: default_page_size(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            transition_ms: default_transition_ms(),
            hold_ms: default_hold_ms(),
            output: default_output(),
        }
    }
}

impl RepositoryConfig {
    /// The parsed start date, if one is configured
    pub fn since_date(&self) -> Result<Option<DateTime<Utc>>, ConfigError> {
        self.since.as_deref().map(parse_date).transpose()
    }

    /// Compiled `source_paths` globs
    pub fn source_matchers(&self) -> Result<Vec<GlobMatcher>, ConfigError> {
        self.source_paths
            .iter()
            .map(|pattern| {
                Glob::new(pattern)
                    .map(|glob| glob.compile_matcher())
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "repository.source_paths".to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ConfigError::InvalidValue {
            key: "repository.since".to_string(),
            reason: format!("'{}' is neither YYYY-MM-DD nor RFC 3339: {}", value, e),
        })
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, TimelineError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, TimelineError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), TimelineError> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = self.to_toml()?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, TimelineError> {
        Ok(toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.build.program.trim().is_empty() {
            return Err(invalid("build.program", "must not be empty"));
        }

        if let Err(e) = regex::Regex::new(&self.build.graph_pattern) {
            return Err(invalid("build.graph_pattern", &e.to_string()));
        }

        if self.build.output_file.as_os_str().is_empty() {
            return Err(invalid("build.output_file", "must not be empty"));
        }

        self.repository.source_matchers()?;
        self.repository.since_date()?;

        if self.contributors.source != "github" && self.contributors.source != "git" {
            return Err(invalid(
                "contributors.source",
                &format!("must be 'github' or 'git', got '{}'", self.contributors.source),
            ));
        }

        if self.contributors.page_size == 0 || self.contributors.page_size > 100 {
            return Err(invalid(
                "contributors.page_size",
                &format!("must be between 1 and 100, got {}", self.contributors.page_size),
            ));
        }

        if self.timeline.transition_ms == 0 {
            return Err(invalid("timeline.transition_ms", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("DEPGRAPH_TIMELINE_REPO") {
            self.repository.path = PathBuf::from(path);
        }

        if let Ok(owner) = std::env::var("DEPGRAPH_TIMELINE_OWNER") {
            self.repository.owner = owner;
        }

        if let Ok(name) = std::env::var("DEPGRAPH_TIMELINE_NAME") {
            self.repository.name = name;
        }

        if let Ok(branch) = std::env::var("DEPGRAPH_TIMELINE_BRANCH") {
            self.repository.branch = branch;
        }

        if let Ok(since) = std::env::var("DEPGRAPH_TIMELINE_SINCE") {
            self.repository.since = Some(since);
        }

        if let Ok(source) = std::env::var("DEPGRAPH_TIMELINE_CONTRIBUTORS") {
            self.contributors.source = source;
        }

        if let Ok(output) = std::env::var("DEPGRAPH_TIMELINE_OUTPUT") {
            self.timeline.output = PathBuf::from(output);
        }

        if let Ok(transition) = std::env::var("DEPGRAPH_TIMELINE_TRANSITION_MS")
            && let Ok(ms) = transition.parse()
        {
            self.timeline.transition_ms = ms;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, TimelineError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

fn invalid(key: &str, reason: &str) -> TimelineError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.repository.branch, "main");
        assert_eq!(config.contributors.page_size, 100);
        assert!(config.build.environment.inherit);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [repository]
            owner = "jcreedcmu"
            name = "Noperthedron"
            since = "2025-09-01"

            [build.environment]
            remove = ["VIRTUAL_ENV"]
            "#,
        )
        .unwrap();

        assert_eq!(config.repository.owner, "jcreedcmu");
        assert_eq!(config.repository.branch, "main");
        assert_eq!(config.build.program, "leanblueprint");
        assert_eq!(config.build.environment.remove, vec!["VIRTUAL_ENV"]);
        assert!(config.build.environment.inherit);
        assert_eq!(config.timeline.transition_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_graph_pattern() {
        let mut config = Config::default();
        config.build.graph_pattern = "(unclosed".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("build.graph_pattern"));
    }

    #[test]
    fn test_invalid_contributor_source() {
        let mut config = Config::default();
        config.contributors.source = "gitlab".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_page_size() {
        let mut config = Config::default();
        config.contributors.page_size = 0;
        assert!(config.validate().is_err());
        config.contributors.page_size = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_transition_rejected() {
        let mut config = Config::default();
        config.timeline.transition_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut config = Config::default();
        config.build.program = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            parse_date("2025-09-01").unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2025-09-01T12:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 1, 10, 30, 0).unwrap()
        );
        assert!(parse_date("September").is_err());
    }

    #[test]
    fn test_source_matchers() {
        let config = RepositoryConfig::default();
        let matchers = config.source_matchers().unwrap();
        assert_eq!(matchers.len(), 1);
        assert!(matchers[0].is_match("blueprint/src/content.tex"));
        assert!(!matchers[0].is_match("Noperthedron/Basic.lean"));

        let bad = RepositoryConfig {
            source_paths: vec!["blueprint/[".to_string()],
            ..RepositoryConfig::default()
        };
        assert!(bad.source_matchers().is_err());
    }

    #[test]
    fn test_malformed_since_rejected() {
        let mut config = Config::default();
        config.repository.since = Some("yesterday".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.repository.owner = "octo".to_string();
        config
            .build
            .environment
            .set
            .insert("LANG".to_string(), "C.UTF-8".to_string());
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.repository.owner, "octo");
        assert_eq!(
            loaded.build.environment.set.get("LANG").map(String::as_str),
            Some("C.UTF-8")
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("none.toml")).unwrap_err();
        assert!(matches!(
            err,
            TimelineError::Config(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[repository\nowner=").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(TimelineError::Config(ConfigError::ParseFailed(_)))
        ));
    }
}
