//! Configuration Module
//!
//! Handles loading server configuration from environment variables and
//! building the immutable worker configuration (version tag + manifest).

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::error::{Result, WorkerError};

// == Defaults ==
/// Bucket name of the current deployment.
pub const DEFAULT_VERSION_TAG: &str = "cv-optimizer-v3";

/// Assets pre-cached at install time.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/static/css/custom.css",
    "/static/css/modern-premium.css",
    "/static/js/main.js",
    "/static/js/theme-toggle.js",
    "/static/icons/icon-192x192.png",
    "/static/icons/icon-512x512.png",
    "/manifest.json",
];

/// Backend the host forwards network requests to.
pub const DEFAULT_UPSTREAM_ORIGIN: &str = "http://127.0.0.1:5000";

/// Tag used by the periodic sync task.
pub const DEFAULT_PERIODIC_SYNC_TAG: &str = "content-sync";

// == Version Tag ==
/// A cache bucket name following the `<app-name>-v<ordinal>` convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag {
    name: String,
    app: String,
    ordinal: u32,
}

impl VersionTag {
    /// Parses a tag such as `cv-optimizer-v3`.
    pub fn parse(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        let (app, ordinal) = tag.rsplit_once("-v").ok_or_else(|| {
            WorkerError::InvalidConfig(format!(
                "Version tag '{}' must look like <app-name>-v<ordinal>",
                tag
            ))
        })?;

        if app.is_empty() {
            return Err(WorkerError::InvalidConfig(format!(
                "Version tag '{}' has an empty app name",
                tag
            )));
        }

        let ordinal = ordinal.parse::<u32>().map_err(|_| {
            WorkerError::InvalidConfig(format!(
                "Version tag '{}' has a non-numeric ordinal",
                tag
            ))
        })?;

        Ok(Self {
            name: tag.to_string(),
            app: app.to_string(),
            ordinal,
        })
    }

    /// Full tag, used verbatim as the bucket name.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn app_name(&self) -> &str {
        &self.app
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Returns true if `other` belongs to the same app with a lower ordinal.
    pub fn supersedes(&self, other: &VersionTag) -> bool {
        self.app == other.app && self.ordinal > other.ordinal
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for VersionTag {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// == Worker Config ==
/// Immutable configuration of one deployed worker version.
///
/// One value exists per deployment; a redeploy builds a new one with a bumped
/// version tag instead of mutating this.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    version: VersionTag,
    manifest: Vec<String>,
    origin: Url,
    same_origin_only: bool,
}

impl WorkerConfig {
    /// Builds a validated worker configuration.
    ///
    /// Manifest paths must be origin-relative (start with a single `/`). Duplicates
    /// are dropped, keeping the first occurrence.
    pub fn new<I, S>(version_tag: &str, manifest: I, origin: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let version = VersionTag::parse(version_tag)?;

        let origin = Url::parse(origin)
            .map_err(|e| WorkerError::InvalidConfig(format!("Invalid origin '{}': {}", origin, e)))?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host().is_none() {
            return Err(WorkerError::InvalidConfig(format!(
                "Origin '{}' must be an http(s) URL with a host",
                origin
            )));
        }

        let mut paths: Vec<String> = Vec::new();
        for path in manifest {
            let path = path.as_ref().trim();
            if path.is_empty() {
                continue;
            }
            if !path.starts_with('/') || path.starts_with("//") {
                return Err(WorkerError::InvalidConfig(format!(
                    "Manifest path '{}' must be origin-relative",
                    path
                )));
            }
            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }

        if paths.is_empty() {
            return Err(WorkerError::InvalidConfig(
                "Asset manifest cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            version,
            manifest: paths,
            origin,
            same_origin_only: true,
        })
    }

    /// Enables or disables interception of cross-origin requests.
    pub fn with_same_origin_only(mut self, same_origin_only: bool) -> Self {
        self.same_origin_only = same_origin_only;
        self
    }

    pub fn version(&self) -> &VersionTag {
        &self.version
    }

    /// Name of the bucket this version owns.
    pub fn cache_name(&self) -> &str {
        self.version.as_str()
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn same_origin_only(&self) -> bool {
        self.same_origin_only
    }

    /// Resolves an origin-relative path against the worker's origin.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .map_err(|e| WorkerError::InvalidRequest(format!("Cannot resolve '{}': {}", path, e)))
    }

    /// Returns true if `url` shares scheme, host and port with the origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port the worker host listens on
    pub server_port: u16,
    /// Backend origin network requests are sent to
    pub upstream_origin: String,
    /// Current cache bucket name
    pub version_tag: String,
    /// Paths pre-cached at install time
    pub manifest: Vec<String>,
    /// Pass cross-origin requests through instead of intercepting them
    pub same_origin_only: bool,
    /// Directory for file-backed buckets, None = in-memory
    pub cache_dir: Option<PathBuf>,
    /// Periodic sync interval in seconds, 0 = disabled
    pub periodic_sync_interval: u64,
    /// Tag sent with periodic sync events
    pub periodic_sync_tag: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_ORIGIN` - Backend origin (default: http://127.0.0.1:5000)
    /// - `SW_VERSION_TAG` - Bucket name (default: cv-optimizer-v3)
    /// - `SW_MANIFEST` - Comma-separated asset paths (default: [`DEFAULT_MANIFEST`])
    /// - `SW_SAME_ORIGIN_ONLY` - Restrict interception to the origin (default: true)
    /// - `CACHE_DIR` - Persist buckets to this directory (default: unset, in-memory)
    /// - `PERIODIC_SYNC_INTERVAL` - Seconds between periodic syncs (default: 0, disabled)
    /// - `PERIODIC_SYNC_TAG` - Periodic sync tag (default: content-sync)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            upstream_origin: env::var("UPSTREAM_ORIGIN").unwrap_or(defaults.upstream_origin),
            version_tag: env::var("SW_VERSION_TAG").unwrap_or(defaults.version_tag),
            manifest: env::var("SW_MANIFEST")
                .ok()
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.manifest),
            same_origin_only: env::var("SW_SAME_ORIGIN_ONLY")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.same_origin_only),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            periodic_sync_interval: env::var("PERIODIC_SYNC_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.periodic_sync_interval),
            periodic_sync_tag: env::var("PERIODIC_SYNC_TAG").unwrap_or(defaults.periodic_sync_tag),
        }
    }

    /// Builds the validated worker configuration from these settings.
    pub fn worker_config(&self) -> Result<WorkerConfig> {
        Ok(
            WorkerConfig::new(&self.version_tag, &self.manifest, &self.upstream_origin)?
                .with_same_origin_only(self.same_origin_only),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upstream_origin: DEFAULT_UPSTREAM_ORIGIN.to_string(),
            version_tag: DEFAULT_VERSION_TAG.to_string(),
            manifest: DEFAULT_MANIFEST.iter().map(|p| p.to_string()).collect(),
            same_origin_only: true,
            cache_dir: None,
            periodic_sync_interval: 0,
            periodic_sync_tag: DEFAULT_PERIODIC_SYNC_TAG.to_string(),
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.version_tag, "cv-optimizer-v3");
        assert_eq!(config.manifest.len(), DEFAULT_MANIFEST.len());
        assert!(config.same_origin_only);
        assert!(config.cache_dir.is_none());
        assert_eq!(config.periodic_sync_interval, 0);
    }

    #[test]
    fn test_default_worker_config_is_valid() {
        let worker = Config::default().worker_config().unwrap();
        assert_eq!(worker.cache_name(), "cv-optimizer-v3");
        assert_eq!(worker.manifest()[0], "/");
        assert!(worker.manifest().iter().any(|p| p == "/manifest.json"));
    }

    #[test]
    fn test_version_tag_parse() {
        let tag = VersionTag::parse("cv-optimizer-v3").unwrap();
        assert_eq!(tag.app_name(), "cv-optimizer");
        assert_eq!(tag.ordinal(), 3);
        assert_eq!(tag.to_string(), "cv-optimizer-v3");
    }

    #[test]
    fn test_version_tag_rejects_malformed() {
        assert!(VersionTag::parse("cv-optimizer").is_err());
        assert!(VersionTag::parse("-v3").is_err());
        assert!(VersionTag::parse("cv-optimizer-vnext").is_err());
    }

    #[test]
    fn test_version_tag_supersedes() {
        let v2: VersionTag = "cv-optimizer-v2".parse().unwrap();
        let v3: VersionTag = "cv-optimizer-v3".parse().unwrap();
        let other: VersionTag = "other-app-v1".parse().unwrap();

        assert!(v3.supersedes(&v2));
        assert!(!v2.supersedes(&v3));
        assert!(!v3.supersedes(&other));
    }

    #[test]
    fn test_worker_config_dedupes_manifest() {
        let config =
            WorkerConfig::new("app-v1", ["/", "/a.css", "/", " /a.css "], "https://example.com")
                .unwrap();
        assert_eq!(config.manifest(), &["/".to_string(), "/a.css".to_string()]);
    }

    #[test]
    fn test_worker_config_rejects_relative_paths() {
        let result = WorkerConfig::new("app-v1", ["static/a.css"], "https://example.com");
        assert!(matches!(result, Err(WorkerError::InvalidConfig(_))));
    }

    #[test]
    fn test_worker_config_rejects_scheme_relative_paths() {
        let result = WorkerConfig::new("app-v1", ["/", "//cdn.example/x.js"], "https://example.com");
        assert!(matches!(result, Err(WorkerError::InvalidConfig(_))));
    }

    #[test]
    fn test_worker_config_rejects_empty_manifest() {
        let result = WorkerConfig::new("app-v1", Vec::<String>::new(), "https://example.com");
        assert!(matches!(result, Err(WorkerError::InvalidConfig(_))));
    }

    #[test]
    fn test_worker_config_rejects_non_http_origin() {
        let result = WorkerConfig::new("app-v1", ["/"], "file:///tmp");
        assert!(matches!(result, Err(WorkerError::InvalidConfig(_))));
    }

    #[test]
    fn test_same_origin_check() {
        let config = WorkerConfig::new("app-v1", ["/"], "https://example.com").unwrap();
        let same = Url::parse("https://example.com/static/js/main.js").unwrap();
        let other_port = Url::parse("https://example.com:8443/").unwrap();
        let cdn = Url::parse("https://cdn.example.net/bootstrap.css").unwrap();

        assert!(config.is_same_origin(&same));
        assert!(!config.is_same_origin(&other_port));
        assert!(!config.is_same_origin(&cdn));
    }

    #[test]
    fn test_resolve_path_against_origin() {
        let config = WorkerConfig::new("app-v1", ["/"], "http://127.0.0.1:5000").unwrap();
        let url = config.resolve("/static/css/custom.css").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/static/css/custom.css");
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_list(" /, /a.js ,,/b.css"), vec!["/", "/a.js", "/b.css"]);
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
