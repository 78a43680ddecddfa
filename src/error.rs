/// Centralized error types for depgraph-timeline using thiserror
///
/// Build and parse failures are expected and frequent during a history walk, so they are
/// kept separate from the fatal kinds (ledger ordering, API, configuration).
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Main error type for the timeline pipeline
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while parsing a graph description
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}, column {column}: {reason}")]
    Syntax {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("no graph found in input")]
    NoGraph,

    #[error("found {count} graphs where exactly one was required")]
    MultipleGraphs { count: usize },
}

/// Errors reported by a build driver for a single commit
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to check out {commit}: {reason}")]
    CheckoutFailed { commit: String, reason: String },

    #[error("Failed to start build command '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Build command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Build output not found: {0}")]
    OutputMissing(PathBuf),

    #[error("Failed to read build output '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Expected exactly one embedded graph, found {found}")]
    GraphMarkers { found: usize },
}

/// Errors raised by the contributor ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Commit {commit} at {found} precedes the previous commit {previous} at {previous_at}")]
    OrderingViolation {
        commit: String,
        found: String,
        previous: String,
        previous_at: String,
    },
}

/// Errors raised by the contributor-history service
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API token missing: set the {0} environment variable")]
    MissingToken(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Query failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Repository or branch not found: {0}")]
    RepositoryNotFound(String),
}

/// Errors related to git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git repository not found at: {0}")]
    RepoNotFound(String),

    #[error("Failed to open git repository: {0}")]
    OpenFailed(String),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Failed to iterate commits: {0}")]
    IterFailed(String),

    #[error("Failed to restore working tree: {0}")]
    RestoreFailed(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to capturing rendered markup from a browser
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid selector '{0}': expected '#id' or '#id tag'")]
    InvalidSelector(String),

    #[error("Failed to launch browser '{browser}': {reason}")]
    LaunchFailed { browser: String, reason: String },

    #[error("Could not find element matching '{selector}' within {timeout_ms} ms")]
    ElementNotFound { selector: String, timeout_ms: u64 },
}

/// Errors related to the SVG to PNG converter
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Input directory not found: {0}")]
    InputNotFound(String),

    #[error("Failed to parse SVG '{file}': {reason}")]
    SvgParse { file: String, reason: String },

    #[error("Invalid raster size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Failed to write PNG '{file}': {reason}")]
    WriteFailed { file: String, reason: String },
}

// Conversion from anyhow::Error to TimelineError
impl From<anyhow::Error> for TimelineError {
    fn from(err: anyhow::Error) -> Self {
        TimelineError::Other(format!("{:#}", err))
    }
}

impl TimelineError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        TimelineError::Other(msg.into())
    }

    /// Whether a history walk may skip the offending commit and continue
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TimelineError::Build(_) | TimelineError::Parse(_))
    }

    /// Check if this is a user error (bad configuration or input) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TimelineError::Config(_)
                | TimelineError::Api(ApiError::MissingToken(_))
                | TimelineError::Capture(CaptureError::InvalidSelector(_))
        )
    }
}
