//! Settings file loading and validation.
//!
//! The settings file is TOML. A path ending in `.gpg` is decrypted with
//! `gpg --decrypt` first so credentials can stay encrypted at rest.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot run gpg to decrypt {}", path.display())]
    DecryptSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("gpg failed to decrypt {} ({status}): {stderr}", path.display())]
    Decrypt {
        path: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("decrypted settings in {} are not UTF-8", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("invalid settings")]
    Parse(#[from] toml::de::Error),

    #[error("no [[sources]] configured")]
    NoSources,

    #[error("source name must not be empty")]
    EmptySourceName,

    #[error("source `{name}` is configured more than once")]
    DuplicateSource { name: String },

    #[error("jira site `{site}` is not an absolute http(s) URL")]
    InvalidJiraSite { site: String },

    #[error("ref_updated handling needs rest_url for source `{name}`")]
    MissingRestUrl { name: String },

    #[error("source `{name}` sets only one of rest_user and rest_password")]
    PartialRestCredentials { name: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub jira: JiraSettings,
    #[serde(default)]
    pub sources: Vec<SourceSettings>,
    #[serde(default)]
    pub handlers: HandlerSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JiraSettings {
    pub site: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl JiraSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl std::fmt::Debug for JiraSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraSettings")
            .field("site", &self.site)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// One upstream Gerrit server.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSettings {
    /// Tag used in comments and logs.
    pub name: String,
    /// SSH destination for `stream-events`; defaults to `name`.
    pub ssh_destination: Option<String>,
    pub ssh_port: Option<u16>,
    /// Web root of the server. Needed for `ref-updated` handling.
    pub rest_url: Option<String>,
    pub rest_user: Option<String>,
    pub rest_password: Option<String>,
}

impl SourceSettings {
    pub fn ssh_destination(&self) -> &str {
        self.ssh_destination.as_deref().unwrap_or(&self.name)
    }

    pub fn rest_credentials(&self) -> Option<(String, String)> {
        match (&self.rest_user, &self.rest_password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSettings")
            .field("name", &self.name)
            .field("ssh_destination", &self.ssh_destination)
            .field("ssh_port", &self.ssh_port)
            .field("rest_url", &self.rest_url)
            .field("rest_user", &self.rest_user)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerSettings {
    #[serde(default = "enabled")]
    pub change_merged: bool,
    #[serde(default)]
    pub ref_updated: bool,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            change_merged: true,
            ref_updated: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySettings {
    /// OTLP gRPC endpoint, e.g. `http://localhost:4317`.
    pub otlp_endpoint: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn enabled() -> bool {
    true
}

impl Settings {
    /// Reads, decrypts if needed, parses and validates the settings at `path`.
    ///
    /// A non-empty `jira_password` replaces the password from the file.
    pub fn load(path: &Path, jira_password: Option<String>) -> Result<Self, ConfigError> {
        let text = read_settings_text(path)?;
        let mut settings = Self::from_toml_str(&text)?;
        if let Some(password) = jira_password.filter(|p| !p.is_empty()) {
            settings.jira.password = password;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::EmptySourceName);
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource {
                    name: source.name.clone(),
                });
            }
            if source.rest_user.is_some() != source.rest_password.is_some() {
                return Err(ConfigError::PartialRestCredentials {
                    name: source.name.clone(),
                });
            }
            if self.handlers.ref_updated && source.rest_url.is_none() {
                return Err(ConfigError::MissingRestUrl {
                    name: source.name.clone(),
                });
            }
        }

        let site_ok = url::Url::parse(&self.jira.site)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false);
        if !site_ok {
            return Err(ConfigError::InvalidJiraSite {
                site: self.jira.site.clone(),
            });
        }

        Ok(())
    }

    pub fn source(&self, name: &str) -> Option<&SourceSettings> {
        self.sources.iter().find(|source| source.name == name)
    }
}

fn read_settings_text(path: &Path) -> Result<String, ConfigError> {
    if path.extension().is_some_and(|ext| ext == "gpg") {
        return decrypt(path);
    }
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn decrypt(path: &Path) -> Result<String, ConfigError> {
    let output = Command::new("gpg")
        .args(["--quiet", "--batch", "--decrypt"])
        .arg(path)
        .output()
        .map_err(|source| ConfigError::DecryptSpawn {
            path: path.to_path_buf(),
            source,
        })?;
    if !output.status.success() {
        return Err(ConfigError::Decrypt {
            path: path.to_path_buf(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    String::from_utf8(output.stdout).map_err(|_| ConfigError::NotUtf8 {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
