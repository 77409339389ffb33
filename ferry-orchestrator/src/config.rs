//! Orchestrator configuration
//!
//! Settings are resolved once at startup from environment variables.
//! Missing or malformed required settings stop the process before the
//! listener binds, never at first request.

use anyhow::Context;
use ferry_core::domain::credentials::{CredentialPair, Credentials};
use std::fmt;
use std::time::Duration;

use crate::service::poller::PollSettings;
use crate::service::stages::{StageApps, StageTemplates};

/// Orchestrator configuration
#[derive(Clone)]
pub struct Config {
    /// Remote task API base URL (e.g., "https://api.sbgenomics.com/v2")
    pub api_endpoint: String,

    /// Platform auth token
    pub auth_token: String,

    /// Project that owns every submitted task
    pub project_id: String,

    /// Remote app identifiers, one per stage
    pub apps: StageApps,

    /// Region passed to every stage
    pub region: String,

    /// Access-key pairs keyed by dataset
    pub credentials: Credentials,

    /// Bucket used when a request names none
    pub default_bucket: String,

    /// Access descriptor handed to the transfer and destination stages
    pub gcp_access: String,

    /// Completion poller settings
    pub poll: PollSettings,

    /// Address the HTTP service binds to
    pub bind_addr: String,

    /// Per-request timeout for calls to the remote API
    pub http_timeout: Duration,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Required:
    /// - API_ENDPOINT, AUTH_TOKEN, SB_PROJECT_ID
    /// - APP_MANIFEST_GENERATION_AWS, APP_GCS_DATA_TRANSFER, APP_MANIFEST_GENERATION_GCS
    /// - AWS_DEFAULT_REGION, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY
    /// - ALT_AWS_ACCESS_KEY_ID, ALT_AWS_SECRET_ACCESS_KEY
    /// - BUCKET, GCP_ACCESS
    ///
    /// Optional:
    /// - POLL_INTERVAL (seconds, default: 20)
    /// - POLL_MAX_ATTEMPTS (default: 15)
    /// - FERRY_BIND_ADDR (default: 0.0.0.0:8080)
    /// - HTTP_TIMEOUT (seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable not set", key))
        };

        let seconds = |key: &str, default: u64| -> anyhow::Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a whole number of seconds", key)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let max_attempts = match lookup("POLL_MAX_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .context("POLL_MAX_ATTEMPTS must be a positive integer")?,
            None => PollSettings::DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            api_endpoint: required("API_ENDPOINT")?,
            auth_token: required("AUTH_TOKEN")?,
            project_id: required("SB_PROJECT_ID")?,
            apps: StageApps {
                source_manifest: required("APP_MANIFEST_GENERATION_AWS")?,
                transfer: required("APP_GCS_DATA_TRANSFER")?,
                destination_manifest: required("APP_MANIFEST_GENERATION_GCS")?,
            },
            region: required("AWS_DEFAULT_REGION")?,
            credentials: Credentials::new(
                CredentialPair::new(
                    required("AWS_ACCESS_KEY_ID")?,
                    required("AWS_SECRET_ACCESS_KEY")?,
                ),
                CredentialPair::new(
                    required("ALT_AWS_ACCESS_KEY_ID")?,
                    required("ALT_AWS_SECRET_ACCESS_KEY")?,
                ),
            ),
            default_bucket: required("BUCKET")?,
            gcp_access: required("GCP_ACCESS")?,
            poll: PollSettings {
                interval: seconds("POLL_INTERVAL", PollSettings::DEFAULT_INTERVAL.as_secs())?,
                max_attempts,
            },
            bind_addr: lookup("FERRY_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            http_timeout: seconds("HTTP_TIMEOUT", 30)?,
        })
    }

    /// Builds the stage templates described by this configuration
    pub fn stage_templates(&self) -> StageTemplates {
        StageTemplates {
            project: self.project_id.clone(),
            apps: self.apps.clone(),
            region: self.region.clone(),
            access_descriptor: self.gcp_access.clone(),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.api_endpoint.starts_with("http://") && !self.api_endpoint.starts_with("https://")
        {
            anyhow::bail!("API_ENDPOINT must start with http:// or https://");
        }

        if self.poll.interval.is_zero() {
            anyhow::bail!("POLL_INTERVAL must be greater than 0");
        }

        if self.poll.max_attempts == 0 {
            anyhow::bail!("POLL_MAX_ATTEMPTS must be greater than 0");
        }

        if self.http_timeout.is_zero() {
            anyhow::bail!("HTTP_TIMEOUT must be greater than 0");
        }

        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("FERRY_BIND_ADDR cannot be empty");
        }

        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_endpoint", &self.api_endpoint)
            .field("auth_token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("apps", &self.apps)
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .field("default_bucket", &self.default_bucket)
            .field("gcp_access", &"<redacted>")
            .field("poll", &self.poll)
            .field("bind_addr", &self.bind_addr)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("API_ENDPOINT", "https://api.example.com/v2"),
            ("AUTH_TOKEN", "secret-token"),
            ("SB_PROJECT_ID", "lab/transfers"),
            ("APP_MANIFEST_GENERATION_AWS", "lab/transfers/manifest-aws"),
            ("APP_GCS_DATA_TRANSFER", "lab/transfers/gcs-transfer"),
            ("APP_MANIFEST_GENERATION_GCS", "lab/transfers/manifest-gcs"),
            ("AWS_DEFAULT_REGION", "us-east-1"),
            ("AWS_ACCESS_KEY_ID", "AKIA_PRIMARY"),
            ("AWS_SECRET_ACCESS_KEY", "primary-secret"),
            ("ALT_AWS_ACCESS_KEY_ID", "AKIA_ALT"),
            ("ALT_AWS_SECRET_ACCESS_KEY", "alt-secret"),
            ("BUCKET", "acme-data"),
            ("GCP_ACCESS", "{\"type\":\"service_account\"}"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> anyhow::Result<Config> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&env()).unwrap();
        assert_eq!(config.poll.interval, Duration::from_secs(20));
        assert_eq!(config.poll.max_attempts, 15);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_fails_fast() {
        let mut vars = env();
        vars.remove("APP_GCS_DATA_TRANSFER");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("APP_GCS_DATA_TRANSFER"));
    }

    #[test]
    fn test_blank_required_is_missing() {
        let mut vars = env();
        vars.insert("AUTH_TOKEN", "   ");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_poll_overrides() {
        let mut vars = env();
        vars.insert("POLL_INTERVAL", "5");
        vars.insert("POLL_MAX_ATTEMPTS", "3");
        let config = load(&vars).unwrap();
        assert_eq!(config.poll.interval, Duration::from_secs(5));
        assert_eq!(config.poll.max_attempts, 3);
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let mut vars = env();
        vars.insert("POLL_INTERVAL", "soon");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = load(&env()).unwrap();

        config.api_endpoint = "api.example.com".to_string();
        assert!(config.validate().is_err());
        config.api_endpoint = "https://api.example.com/v2".to_string();

        config.poll.max_attempts = 0;
        assert!(config.validate().is_err());
        config.poll.max_attempts = 15;

        config.poll.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", load(&env()).unwrap());
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("service_account"));
        assert!(!rendered.contains("primary-secret"));
    }
}
