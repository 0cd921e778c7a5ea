//! Configuration management for RW math rendering.
//!
//! Parses `rw.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `math.inline_href`
//! - `math.script_type`
//! - `math.command`
//! - `math.args`
//! - `math.display_arg`
//! - `cache.dir`

mod expand;

use rw_math::{DEFAULT_COMMAND, DEFAULT_DISPLAY_ARG, DEFAULT_INLINE_HREF, DEFAULT_SCRIPT_TYPE};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override renderer backend.
    pub renderer: Option<RendererKind>,
    /// Override render failure handling.
    pub on_error: Option<ErrorMode>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "rw.toml";

/// Default cache directory, relative to the config file.
const DEFAULT_CACHE_DIR: &str = ".rw/cache";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Math rendering configuration.
    pub math: MathConfig,
    /// Cache configuration (paths are relative strings from TOML).
    cache: CacheConfigRaw,

    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Math renderer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// In-process KaTeX (requires the `katex` build feature).
    Katex,
    /// External program reading math on stdin.
    #[default]
    Command,
}

/// Markup produced by the in-process renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// HTML only.
    Html,
    /// MathML only.
    Mathml,
    /// HTML plus MathML.
    #[default]
    HtmlAndMathml,
}

/// Handling of placeholders that fail to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Stop processing the document.
    #[default]
    Abort,
    /// Replace the placeholder with an error marker and continue.
    Inline,
}

impl FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "katex" => Ok(Self::Katex),
            "command" => Ok(Self::Command),
            other => Err(format!(
                "unknown renderer '{other}', expected 'katex' or 'command'"
            )),
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Katex => f.write_str("katex"),
            Self::Command => f.write_str("command"),
        }
    }
}

impl FromStr for ErrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "inline" => Ok(Self::Inline),
            other => Err(format!(
                "unknown error mode '{other}', expected 'abort' or 'inline'"
            )),
        }
    }
}

/// Math rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MathConfig {
    /// `href` marking inline placeholders.
    pub inline_href: String,
    /// `type` marking script placeholders.
    pub script_type: String,
    /// Renderer backend.
    pub renderer: RendererKind,
    /// Program run by the command renderer.
    pub command: String,
    /// Arguments passed to the command before the display argument.
    pub args: Vec<String>,
    /// Argument appended in display mode (empty disables it).
    pub display_arg: String,
    /// Markup flavor for the in-process renderer.
    pub output: OutputKind,
    /// Render failure handling.
    pub on_error: ErrorMode,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            inline_href: DEFAULT_INLINE_HREF.to_owned(),
            script_type: DEFAULT_SCRIPT_TYPE.to_owned(),
            renderer: RendererKind::default(),
            command: DEFAULT_COMMAND.to_owned(),
            args: Vec::new(),
            display_arg: DEFAULT_DISPLAY_ARG.to_owned(),
            output: OutputKind::default(),
            on_error: ErrorMode::default(),
        }
    }
}

/// Raw cache configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
}

/// Resolved cache configuration with absolute paths.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Whether rendered fragments are cached.
    pub enabled: bool,
    /// Cache directory.
    pub dir: PathBuf,
}

impl CacheConfig {
    /// Directory holding rendered math fragments.
    #[must_use]
    pub fn math_dir(&self) -> PathBuf {
        self.dir.join("math")
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`math.command`").
        field: String,
        /// Error message (e.g., "${`KATEX_BIN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `rw.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(renderer) = settings.renderer {
            self.math.renderer = renderer;
        }
        if let Some(on_error) = settings.on_error {
            self.math.on_error = on_error;
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = cache_enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            math: MathConfig::default(),
            cache: CacheConfigRaw::default(),
            cache_resolved: CacheConfig {
                enabled: true,
                dir: base.join(DEFAULT_CACHE_DIR),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_math()?;
        Ok(())
    }

    /// Validate math configuration.
    fn validate_math(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.math.inline_href, "math.inline_href")?;
        require_non_empty(&self.math.script_type, "math.script_type")?;

        if self.math.renderer == RendererKind::Command {
            require_non_empty(&self.math.command, "math.command")?;
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let math = &mut self.math;
        math.inline_href = expand::expand_env(&math.inline_href, "math.inline_href")?;
        math.script_type = expand::expand_env(&math.script_type, "math.script_type")?;
        math.command = expand::expand_env(&math.command, "math.command")?;
        math.display_arg = expand::expand_env(&math.display_arg, "math.display_arg")?;
        for arg in &mut math.args {
            *arg = expand::expand_env(arg, "math.args")?;
        }

        if let Some(ref dir) = self.cache.dir {
            self.cache.dir = Some(expand::expand_env(dir, "cache.dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            dir: config_dir.join(self.cache.dir.as_deref().unwrap_or(DEFAULT_CACHE_DIR)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.math.inline_href, "/$/");
        assert_eq!(config.math.script_type, "math/tex");
        assert_eq!(config.math.renderer, RendererKind::Command);
        assert_eq!(config.math.command, "katex");
        assert!(config.math.args.is_empty());
        assert_eq!(config.math.display_arg, "--display-mode");
        assert_eq!(config.math.output, OutputKind::HtmlAndMathml);
        assert_eq!(config.math.on_error, ErrorMode::Abort);
        assert!(config.cache_resolved.enabled);
        assert_eq!(config.cache_resolved.dir, PathBuf::from("/test/.rw/cache"));
        assert_eq!(
            config.cache_resolved.math_dir(),
            PathBuf::from("/test/.rw/cache/math")
        );
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.math.inline_href, "/$/");
        assert_eq!(config.math.renderer, RendererKind::Command);
    }

    #[test]
    fn test_parse_math_config() {
        let toml = r##"
[math]
inline_href = "#math"
script_type = "math/latex"
renderer = "katex"
command = "npx"
args = ["katex"]
display_arg = "-d"
output = "mathml"
on_error = "inline"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.math.inline_href, "#math");
        assert_eq!(config.math.script_type, "math/latex");
        assert_eq!(config.math.renderer, RendererKind::Katex);
        assert_eq!(config.math.command, "npx");
        assert_eq!(config.math.args, vec!["katex".to_owned()]);
        assert_eq!(config.math.display_arg, "-d");
        assert_eq!(config.math.output, OutputKind::Mathml);
        assert_eq!(config.math.on_error, ErrorMode::Inline);
    }

    #[test]
    fn test_parse_unknown_renderer_fails() {
        let toml = r#"
[math]
renderer = "mathjax"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[cache]
enabled = false
dir = "build/cache"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert!(!config.cache_resolved.enabled);
        assert_eq!(
            config.cache_resolved.dir,
            PathBuf::from("/project/build/cache")
        );
    }

    #[test]
    fn test_defaults_match_math_markers() {
        let math = MathConfig::default();
        let markers = rw_math::Markers::default();
        assert_eq!(math.inline_href, markers.inline_href);
        assert_eq!(math.script_type, markers.script_type);
        assert_eq!(math.command, rw_math::DEFAULT_COMMAND);
        assert_eq!(math.display_arg, rw_math::DEFAULT_DISPLAY_ARG);
    }

    #[test]
    fn test_resolve_paths_defaults() {
        let mut config: Config = toml::from_str("").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert!(config.cache_resolved.enabled);
        assert_eq!(
            config.cache_resolved.dir,
            PathBuf::from("/project/.rw/cache")
        );
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rw.toml");
        std::fs::write(
            &path,
            r#"
[math]
on_error = "inline"

[cache]
dir = "cache"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.math.on_error, ErrorMode::Inline);
        assert_eq!(config.cache_resolved.dir, temp.path().join("cache"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_path() {
        let result = Config::load(Some(Path::new("/nonexistent/rw.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rw.toml");
        std::fs::write(&path, "[math\n").unwrap();

        let result = Config::load(Some(&path), None);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_apply_cli_settings_renderer() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            renderer: Some(RendererKind::Katex),
            ..Default::default()
        };
        config.apply_cli_settings(&settings);

        assert_eq!(config.math.renderer, RendererKind::Katex);
        assert_eq!(config.math.on_error, ErrorMode::Abort);
    }

    #[test]
    fn test_apply_cli_settings_multiple() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            renderer: Some(RendererKind::Command),
            on_error: Some(ErrorMode::Inline),
            cache_enabled: Some(false),
        };
        config.apply_cli_settings(&settings);

        assert_eq!(config.math.renderer, RendererKind::Command);
        assert_eq!(config.math.on_error, ErrorMode::Inline);
        assert!(!config.cache_resolved.enabled);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.math.renderer, RendererKind::Command);
        assert_eq!(config.math.on_error, ErrorMode::Abort);
        assert!(config.cache_resolved.enabled);
    }

    #[test]
    fn test_renderer_kind_from_str() {
        assert_eq!("katex".parse::<RendererKind>(), Ok(RendererKind::Katex));
        assert_eq!("command".parse::<RendererKind>(), Ok(RendererKind::Command));
        assert!(
            "mathjax"
                .parse::<RendererKind>()
                .unwrap_err()
                .contains("mathjax")
        );
        assert_eq!(RendererKind::Katex.to_string(), "katex");
    }

    #[test]
    fn test_error_mode_from_str() {
        assert_eq!("abort".parse::<ErrorMode>(), Ok(ErrorMode::Abort));
        assert_eq!("inline".parse::<ErrorMode>(), Ok(ErrorMode::Inline));
        assert!("skip".parse::<ErrorMode>().is_err());
    }

    #[test]
    fn test_expand_env_vars_math() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("TEST_KATEX_BIN", "/opt/katex/bin/katex");
            std::env::set_var("TEST_KATEX_MACROS", "macros.json");
        }

        let toml = r#"
[math]
command = "${TEST_KATEX_BIN}"
args = ["--macro-file", "${TEST_KATEX_MACROS}"]
display_arg = "${TEST_DISPLAY_ARG:--d}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.math.command, "/opt/katex/bin/katex");
        assert_eq!(
            config.math.args,
            vec!["--macro-file".to_owned(), "macros.json".to_owned()]
        );
        assert_eq!(config.math.display_arg, "-d");

        unsafe {
            std::env::remove_var("TEST_KATEX_BIN");
            std::env::remove_var("TEST_KATEX_MACROS");
        }
    }

    #[test]
    fn test_expand_env_vars_cache_dir() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("TEST_CACHE_ROOT", "/var/cache/rw");
        }

        let toml = r#"
[cache]
dir = "${TEST_CACHE_ROOT}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.cache_resolved.dir, PathBuf::from("/var/cache/rw"));

        unsafe {
            std::env::remove_var("TEST_CACHE_ROOT");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MISSING_VAR_CONFIG_TEST");
        }

        let toml = r#"
[math]
command = "${MISSING_VAR_CONFIG_TEST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_CONFIG_TEST"));
        assert!(err.to_string().contains("math.command"));
    }

    #[test]
    fn test_expand_env_vars_literal_unchanged() {
        let mut config: Config = toml::from_str("").unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.math.inline_href, "/$/");
        assert_eq!(config.math.command, "katex");
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_inline_href_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.math.inline_href = String::new();
        assert_validation_error(&config, &["math.inline_href", "empty"]);
    }

    #[test]
    fn test_validate_script_type_blank() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.math.script_type = "  ".to_owned();
        assert_validation_error(&config, &["math.script_type", "empty"]);
    }

    #[test]
    fn test_validate_script_type_with_parameters_allowed() {
        // Matched as a whole value, so opting into MathJax-style types is valid
        let mut config = Config::default_with_base(Path::new("/test"));
        config.math.script_type = "math/tex; mode=display".to_owned();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_command_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.math.command = String::new();
        assert_validation_error(&config, &["math.command", "empty"]);
    }

    #[test]
    fn test_validate_command_ignored_for_katex() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.math.renderer = RendererKind::Katex;
        config.math.command = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_validates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rw.toml");
        std::fs::write(&path, "[math]\ninline_href = \"\"\n").unwrap();

        let result = Config::load(Some(&path), None);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
