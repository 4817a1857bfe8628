use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root configuration, read from `meshdir.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshdirConfig {
    pub directory: DirectoryConfig,
    pub logging: LoggingConfig,
}

// ── Directory ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Base URL of the directory API; operation paths are joined onto it.
    pub base_url: String,
    /// Sent as `User-Agent` on every request.
    pub user_agent: String,
    /// Per-request timeout applied by the HTTP transport.
    pub timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nordvpn.com".into(),
            user_agent: format!("meshdir/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl MeshdirConfig {
    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Base URL ───
        let base_url = &self.directory.base_url;
        if base_url.is_empty() {
            warnings.push(ConfigWarning {
                field: "directory.base_url".into(),
                message: "base URL is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'https://api.nordvpn.com'".into()),
            });
        } else {
            match Url::parse(base_url) {
                Ok(url) if url.scheme() == "https" => {}
                Ok(url) if url.scheme() == "http" => {
                    warnings.push(ConfigWarning {
                        field: "directory.base_url".into(),
                        message: format!("'{}' is not encrypted", base_url),
                        severity: WarningSeverity::Warning,
                        hint: Some("Bearer tokens are sent in the clear over plain http".into()),
                    });
                }
                Ok(url) => {
                    warnings.push(ConfigWarning {
                        field: "directory.base_url".into(),
                        message: format!("unsupported scheme '{}'", url.scheme()),
                        severity: WarningSeverity::Error,
                        hint: Some("Use an http:// or https:// URL".into()),
                    });
                }
                Err(e) => {
                    warnings.push(ConfigWarning {
                        field: "directory.base_url".into(),
                        message: format!("'{}' is not a valid URL: {}", base_url, e),
                        severity: WarningSeverity::Error,
                        hint: None,
                    });
                }
            }
        }

        // ── User agent ───
        if self.directory.user_agent.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "directory.user_agent".into(),
                message: "user agent is empty".into(),
                severity: WarningSeverity::Error,
                hint: None,
            });
        }

        // ── Timeout ───
        if self.directory.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                field: "directory.timeout_secs".into(),
                message: "timeout is 0, every request would fail immediately".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 30".into()),
            });
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
