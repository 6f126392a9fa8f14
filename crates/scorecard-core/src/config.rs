use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use url::Url;

/// Environment-driven configuration for the publication service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub results_bucket: String,
    pub cron_bucket: String,
    pub tlog_url: Url,
    pub forge_api_url: Url,
    pub http_timeout: Duration,
    pub request_deadline: Duration,
    pub trust_overrides: TrustOverrides,
    pub port: u16,
}

/// Optional on-disk replacements for the compiled-in trust material.
#[derive(Debug, Clone, Default)]
pub struct TrustOverrides {
    pub fulcio_root: Option<PathBuf>,
    pub fulcio_intermediate: Option<PathBuf>,
    pub tlog_key: Option<PathBuf>,
}

impl ServerConfig {
    /// Build a [`ServerConfig`] by reading the documented SCORECARD_* variables.
    pub fn from_env() -> Result<Self> {
        let results_bucket = env::var("SCORECARD_RESULTS_BUCKET")
            .unwrap_or_else(|_| "gs://ossf-scorecard-results".to_string());
        let cron_bucket = env::var("SCORECARD_CRON_BUCKET")
            .unwrap_or_else(|_| "gs://ossf-scorecard-cron-results".to_string());
        validate_bucket(&results_bucket)?;
        validate_bucket(&cron_bucket)?;

        let tlog_url = parse_url_var("SCORECARD_TLOG_URL", "https://rekor.sigstore.dev")?;
        let forge_api_url = parse_url_var("SCORECARD_FORGE_API_URL", "https://api.github.com")?;

        let http_timeout = Duration::from_secs(parse_secs_var("SCORECARD_HTTP_TIMEOUT_SECS", 30)?);
        let request_deadline =
            Duration::from_secs(parse_secs_var("SCORECARD_REQUEST_DEADLINE_SECS", 120)?);

        let trust_overrides = TrustOverrides {
            fulcio_root: env::var("SCORECARD_FULCIO_ROOT").ok().map(PathBuf::from),
            fulcio_intermediate: env::var("SCORECARD_FULCIO_INTERMEDIATE")
                .ok()
                .map(PathBuf::from),
            tlog_key: env::var("SCORECARD_TLOG_KEY").ok().map(PathBuf::from),
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT `{raw}` is not a valid port number"))?,
            Err(_) => 8080,
        };

        Ok(Self {
            results_bucket,
            cron_bucket,
            tlog_url,
            forge_api_url,
            http_timeout,
            request_deadline,
            trust_overrides,
            port,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

fn validate_bucket(value: &str) -> Result<()> {
    let Some((scheme, rest)) = value.split_once("://") else {
        bail!("bucket `{value}` is missing a URI scheme");
    };
    if rest.is_empty() {
        bail!("bucket `{value}` is missing a location");
    }
    match scheme {
        "gs" | "file" | "mem" => Ok(()),
        other => bail!("unsupported bucket scheme `{other}`"),
    }
}

fn parse_url_var(name: &str, default: &str) -> Result<Url> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).with_context(|| format!("{name} is not a valid URL"))
}

fn parse_secs_var(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{name} `{raw}` is not a number of seconds")),
        Err(_) => Ok(default),
    }
}
