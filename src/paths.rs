/// Platform-specific locations for configuration and scratch files
///
/// Follows XDG base directories on Linux and the native conventions on
/// macOS and Windows.
use std::path::PathBuf;

const APP_DIR: &str = "depgraph-timeline";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            home_join("Library/Application Support")
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home_join(".config"))
        }
    }

    /// Get the appropriate cache directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Caches
    /// - Linux/Unix: $XDG_CACHE_HOME or ~/.cache
    pub fn cache_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("LOCALAPPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            home_join("Library/Caches")
        } else {
            std::env::var("XDG_CACHE_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home_join(".cache"))
        }
    }

    /// Returns: {config_dir}/depgraph-timeline
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Returns: {cache_dir}/depgraph-timeline
    pub fn project_cache_dir() -> PathBuf {
        Self::cache_dir().join(APP_DIR)
    }

    /// Get default config file path
    ///
    /// Returns: {config_dir}/depgraph-timeline/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }

    /// Scratch profile directory for the headless browser
    ///
    /// Returns: {cache_dir}/depgraph-timeline/browser-profile
    pub fn browser_profile_dir() -> PathBuf {
        Self::project_cache_dir().join("browser-profile")
    }
}

fn home_join(relative: &str) -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(relative))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_dir_not_empty() {
        assert!(!PlatformPaths::config_dir().as_os_str().is_empty());
        assert!(!PlatformPaths::cache_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_default_config_path() {
        let path = PlatformPaths::default_config_path();
        assert!(path.to_string_lossy().contains(APP_DIR));
        assert!(path.ends_with("config.toml"));
        assert!(path.starts_with(PlatformPaths::config_dir()));
    }

    #[test]
    fn test_browser_profile_under_cache() {
        let path = PlatformPaths::browser_profile_dir();
        assert!(path.starts_with(PlatformPaths::project_cache_dir()));
        assert!(path.ends_with("browser-profile"));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_config_dir_with_xdg_config_home() {
        let original = env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", "/custom/config");
        }

        let dir = PlatformPaths::config_dir();
        assert_eq!(dir, PathBuf::from("/custom/config"));

        unsafe {
            match original {
                Some(val) => env::set_var("XDG_CONFIG_HOME", val),
                None => env::remove_var("XDG_CONFIG_HOME"),
            }
        }
    }
}
