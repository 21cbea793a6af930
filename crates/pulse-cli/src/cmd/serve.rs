use super::Context;
use anyhow::Context as _;
use pulse_core::config::{Config, WarnLevel};
use pulse_core::store::RecordStore;
use pulse_server::AppState;
use std::sync::Arc;

pub fn run(ctx: &Context, port: Option<u16>, bind: Option<String>) -> anyhow::Result<()> {
    let mut config = ctx.load_config()?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let warnings = config.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => tracing::error!("{}", w.message),
        }
    }
    if Config::has_errors(&warnings) {
        anyhow::bail!("config validation found errors; run `pulse config validate`");
    }

    let store = ctx.open_store(&config)?;
    let version = store.migrate().context("failed to migrate database")?;
    tracing::info!(path = %config.database.path, schema = version, "database ready");

    let state = AppState::from_config(Arc::new(store), &config);
    let bind = config.server.bind.clone();
    let port = config.server.port;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        tokio::select! {
            result = pulse_server::serve(state, &bind, port) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
