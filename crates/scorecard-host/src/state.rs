use std::sync::Arc;

use anyhow::{Context, Result};
use scorecard_core::ServerConfig;
use scorecard_core::forge::ForgeClient;
use scorecard_core::store::StoreRegistry;
use scorecard_signing::{TlogClient, TrustMaterial};
use time::OffsetDateTime;

/// Shared, read-only server state. Everything here is either immutable
/// (trust material, config) or internally synchronized (HTTP clients).
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub trust: Arc<TrustMaterial>,
    pub tlog: TlogClient,
    pub forge: ForgeClient,
    pub stores: Arc<StoreRegistry>,
    pub started_at: OffsetDateTime,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let trust = load_trust_material(&config).context("loading trust material")?;
        let tlog = TlogClient::new(config.tlog_url.clone(), config.http_timeout)
            .context("building transparency-log client")?;
        let forge = ForgeClient::new(config.forge_api_url.clone(), config.http_timeout)
            .context("building source-host client")?;
        let mut stores = StoreRegistry::default();
        stores
            .register_builtin(config.http_timeout)
            .context("registering blob stores")?;

        Ok(Self {
            config: Arc::new(config),
            trust: Arc::new(trust),
            tlog,
            forge,
            stores: Arc::new(stores),
            started_at: OffsetDateTime::now_utc(),
        })
    }
}

fn load_trust_material(config: &ServerConfig) -> Result<TrustMaterial> {
    let overrides = &config.trust_overrides;
    if overrides.fulcio_root.is_none()
        && overrides.fulcio_intermediate.is_none()
        && overrides.tlog_key.is_none()
    {
        return Ok(TrustMaterial::embedded()?);
    }

    let root = read_or_embedded(overrides.fulcio_root.as_deref(), scorecard_signing::keys::FULCIO_ROOT_PEM)?;
    let intermediate = read_or_embedded(
        overrides.fulcio_intermediate.as_deref(),
        scorecard_signing::keys::FULCIO_INTERMEDIATE_PEM,
    )?;
    let log_key = read_or_embedded(
        overrides.tlog_key.as_deref(),
        scorecard_signing::keys::TLOG_PUBLIC_KEY_PEM,
    )?;
    Ok(TrustMaterial::from_pem(&root, &intermediate, &log_key)?)
}

fn read_or_embedded(path: Option<&std::path::Path>, embedded: &[u8]) -> Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("reading trust material from {}", path.display())),
        None => Ok(embedded.to_vec()),
    }
}
