//! Configuration management for Weave.
//!
//! Parses `weave.toml` with serde and discovers it in the current directory
//! or any parent. CLI flags are applied on top via [`CliSettings`].
//!
//! ```toml
//! [site]
//! base_url = "https://${DOCS_HOST:-localhost}/"
//! path_style = "directory-slash"
//! manifest = "site.json"
//!
//! [template]
//! max_depth = 64
//! default = "templates/page.html"
//!
//! [publish]
//! output_dir = "public"
//! cache_enabled = true
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `site.base_url` and `publish.output_dir` support `${VAR}` and
//! `${VAR:-default}`. An unset variable without a default is an error.

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use weave_site::{PathSettings, PathStyle};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "weave.toml";

/// Directory holding Weave's own state, next to the config file.
const PROJECT_DIR_NAME: &str = ".weave";

/// Largest accepted `template.max_depth`.
const MAX_TEMPLATE_DEPTH: usize = 1024;

/// CLI settings that override configuration file values.
///
/// Only `Some` fields override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override site base URL.
    pub base_url: Option<String>,
    /// Override manifest path.
    pub manifest: Option<PathBuf>,
    /// Override publish output directory.
    pub output_dir: Option<PathBuf>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "site")]
    site_raw: SiteConfigRaw,
    #[serde(rename = "template")]
    template_raw: TemplateConfigRaw,
    #[serde(rename = "publish")]
    publish_raw: PublishConfigRaw,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site: SiteConfig,
    /// Resolved template configuration (set after loading).
    #[serde(skip)]
    pub template: TemplateConfig,
    /// Resolved publish configuration (set after loading).
    #[serde(skip)]
    pub publish: PublishConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SiteConfigRaw {
    base_url: Option<String>,
    path_style: Option<PathStyle>,
    index_file_name: Option<String>,
    default_extension: Option<String>,
    manifest: Option<String>,
}

/// Resolved site configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Published site root.
    pub base_url: String,
    /// Link style for collections without their own.
    pub path_style: PathStyle,
    /// Name of a collection's index file.
    pub index_file_name: String,
    /// Extension for pages without a custom one.
    pub default_extension: String,
    /// Site manifest listing pages and content.
    pub manifest: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

impl SiteConfig {
    fn with_base(base: &Path) -> Self {
        let paths = PathSettings::default();
        Self {
            base_url: paths.base_url,
            path_style: paths.default_style,
            index_file_name: paths.index_file_name,
            default_extension: paths.default_extension,
            manifest: base.join("site.json"),
        }
    }

    /// Path computation inputs for a `weave_site::Site`.
    #[must_use]
    pub fn path_settings(&self) -> PathSettings {
        PathSettings {
            base_url: self.base_url.clone(),
            default_style: self.path_style,
            index_file_name: self.index_file_name.clone(),
            default_extension: self.default_extension.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateConfigRaw {
    max_depth: Option<usize>,
    default: Option<String>,
}

/// Resolved template configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    /// Maximum block nesting.
    pub max_depth: usize,
    /// Template file used by pages without their own.
    pub default: Option<PathBuf>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            max_depth: weave_site::SiteSettings::default().max_template_depth,
            default: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PublishConfigRaw {
    output_dir: Option<String>,
    cache_enabled: Option<bool>,
}

/// Resolved publish configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// Directory published pages are written to.
    pub output_dir: PathBuf,
    /// Project directory for Weave state (`.weave/`).
    pub project_dir: PathBuf,
    /// Whether committed digests are cached between runs.
    pub cache_enabled: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

impl PublishConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            output_dir: base.join("public"),
            project_dir: base.join(PROJECT_DIR_NAME),
            cache_enabled: true,
        }
    }

    /// Cache directory path (`.weave/cache/`).
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir.join("cache")
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
        /// Config field path (e.g., "`site.base_url`").
        field: String,
        /// Error message (e.g., "${`DOCS_HOST`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `weave.toml` in the current directory and its parents, falling
    /// back to defaults relative to the current directory.
    ///
    /// CLI settings are applied last and take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit `config_path` doesn't exist, or parsing,
    /// expansion or validation fails.
    pub fn load(config_path: Option<&Path>, cli_settings: Option<&CliSettings>) -> Result<Self, ConfigError> {
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
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(base_url) = &settings.base_url {
            self.site.base_url.clone_from(base_url);
        }
        if let Some(manifest) = &settings.manifest {
            self.site.manifest.clone_from(manifest);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.publish.output_dir.clone_from(output_dir);
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.publish.cache_enabled = cache_enabled;
        }
    }

    /// Search for the config file in the current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let start = std::env::current_dir().ok()?;
        Self::discover_from(&start)
    }

    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
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

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Default config with paths relative to `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site_raw: SiteConfigRaw::default(),
            template_raw: TemplateConfigRaw::default(),
            publish_raw: PublishConfigRaw::default(),
            site: SiteConfig::with_base(base),
            template: TemplateConfig::default(),
            publish: PublishConfig::with_base(base),
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI settings
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_site()?;
        self.validate_template()?;
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        let site = &self.site;
        require_non_empty(&site.base_url, "site.base_url")?;
        if !site.base_url.starts_with("http://")
            && !site.base_url.starts_with("https://")
            && !site.base_url.starts_with('/')
        {
            return Err(ConfigError::Validation(
                "site.base_url must start with http://, https:// or /".to_owned(),
            ));
        }

        require_non_empty(&site.index_file_name, "site.index_file_name")?;
        if site.index_file_name.contains('/') {
            return Err(ConfigError::Validation(
                "site.index_file_name cannot contain '/'".to_owned(),
            ));
        }
        if site.default_extension.contains(['/', '.']) {
            return Err(ConfigError::Validation(
                "site.default_extension cannot contain '/' or '.'".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_template(&self) -> Result<(), ConfigError> {
        let depth = self.template.max_depth;
        if depth == 0 {
            return Err(ConfigError::Validation(
                "template.max_depth must be greater than 0".to_owned(),
            ));
        }
        if depth > MAX_TEMPLATE_DEPTH {
            return Err(ConfigError::Validation(format!(
                "template.max_depth cannot exceed {MAX_TEMPLATE_DEPTH}"
            )));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.site_raw.base_url {
            self.site_raw.base_url = Some(expand::expand_env(url, "site.base_url")?);
        }
        if let Some(ref dir) = self.publish_raw.output_dir {
            self.publish_raw.output_dir = Some(expand::expand_env(dir, "publish.output_dir")?);
        }
        Ok(())
    }

    /// Fill the resolved sections, joining relative paths onto `config_dir`.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let defaults = Self::default_with_base(config_dir);
        let resolve = |path: Option<&str>, default: PathBuf| path.map_or(default, |p| config_dir.join(p));

        let raw = &self.site_raw;
        self.site = SiteConfig {
            base_url: raw.base_url.clone().unwrap_or(defaults.site.base_url),
            path_style: raw.path_style.unwrap_or(defaults.site.path_style),
            index_file_name: raw.index_file_name.clone().unwrap_or(defaults.site.index_file_name),
            default_extension: raw
                .default_extension
                .clone()
                .unwrap_or(defaults.site.default_extension),
            manifest: resolve(raw.manifest.as_deref(), defaults.site.manifest),
        };

        self.template = TemplateConfig {
            max_depth: self.template_raw.max_depth.unwrap_or(defaults.template.max_depth),
            default: self.template_raw.default.as_deref().map(|p| config_dir.join(p)),
        };

        self.publish = PublishConfig {
            output_dir: resolve(self.publish_raw.output_dir.as_deref(), defaults.publish.output_dir),
            project_dir: defaults.publish.project_dir,
            cache_enabled: self.publish_raw.cache_enabled.unwrap_or(true),
        };
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn parse(toml: &str, dir: &Path) -> Config {
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(dir);
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.site.base_url, "/");
        assert_eq!(config.site.path_style, PathStyle::DirectoryWithSeparator);
        assert_eq!(config.site.index_file_name, "index.html");
        assert_eq!(config.site.default_extension, "html");
        assert_eq!(config.site.manifest, PathBuf::from("/test/site.json"));
        assert_eq!(config.template.max_depth, 64);
        assert_eq!(config.template.default, None);
        assert_eq!(config.publish.output_dir, PathBuf::from("/test/public"));
        assert_eq!(config.publish.cache_dir(), PathBuf::from("/test/.weave/cache"));
        assert!(config.publish.cache_enabled);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse("", Path::new("/project"));
        assert_eq!(config.site, Config::default_with_base(Path::new("/project")).site);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[site]
base_url = "https://docs.example.com"
path_style = "index-file"
index_file_name = "default.htm"
default_extension = "htm"
manifest = "content/site.json"

[template]
max_depth = 16
default = "templates/page.html"

[publish]
output_dir = "dist"
cache_enabled = false
"#;
        let config = parse(toml, Path::new("/project"));

        assert_eq!(config.site.base_url, "https://docs.example.com");
        assert_eq!(config.site.path_style, PathStyle::IndexFile);
        assert_eq!(config.site.index_file_name, "default.htm");
        assert_eq!(config.site.manifest, PathBuf::from("/project/content/site.json"));
        assert_eq!(config.template.max_depth, 16);
        assert_eq!(config.template.default, Some(PathBuf::from("/project/templates/page.html")));
        assert_eq!(config.publish.output_dir, PathBuf::from("/project/dist"));
        assert_eq!(config.publish.project_dir, PathBuf::from("/project/.weave"));
        assert!(!config.publish.cache_enabled);

        let paths = config.site.path_settings();
        assert_eq!(paths.default_style, PathStyle::IndexFile);
        assert_eq!(paths.default_extension, "htm");
    }

    #[test]
    fn test_unknown_path_style_is_parse_error() {
        let result = toml::from_str::<Config>("[site]\npath_style = \"flat\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.base_url = "ftp://example.com".to_owned();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("site.base_url"));

        config.site.base_url = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_file_names() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.index_file_name = "a/index.html".to_owned();
        assert!(config.validate().unwrap_err().to_string().contains("site.index_file_name"));

        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.default_extension = "tar.gz".to_owned();
        assert!(config.validate().unwrap_err().to_string().contains("site.default_extension"));

        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.default_extension = String::new();
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_max_depth() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.template.max_depth = 0;
        assert!(config.validate().unwrap_err().to_string().contains("greater than 0"));

        config.template.max_depth = MAX_TEMPLATE_DEPTH + 1;
        assert!(config.validate().unwrap_err().to_string().contains("cannot exceed"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings {
            base_url: Some("https://example.com".to_owned()),
            output_dir: Some(PathBuf::from("/out")),
            cache_enabled: Some(false),
            ..Default::default()
        });

        assert_eq!(config.site.base_url, "https://example.com");
        assert_eq!(config.publish.output_dir, PathBuf::from("/out"));
        assert!(!config.publish.cache_enabled);
        assert_eq!(config.site.manifest, PathBuf::from("/test/site.json"));
    }

    #[test]
    fn test_load_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weave.toml");
        fs::write(&path, "[publish]\noutput_dir = \"${WEAVE_TEST_LOAD_OUT:-site}\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.publish.output_dir, tmp.path().join("site"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/weave.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_reports_unset_variable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weave.toml");
        fs::write(&path, "[site]\nbase_url = \"${WEAVE_TEST_LOAD_UNSET_HOST}\"\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { ref field, .. } if field == "site.base_url"));
    }

    #[test]
    fn test_load_rejects_invalid_cli_override() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weave.toml");
        fs::write(&path, "").unwrap();

        let settings = CliSettings {
            base_url: Some("example.com".to_owned()),
            ..Default::default()
        };
        assert!(matches!(
            Config::load(Some(&path), Some(&settings)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_discover_in_parent() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("docs/guides");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "").unwrap();

        assert_eq!(Config::discover_from(&nested), Some(tmp.path().join(CONFIG_FILENAME)));
    }
}
