use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};

use crate::config::DbConfig;

pub fn connect_options(cfg: &DbConfig) -> anyhow::Result<PgConnectOptions> {
    if let Some(url) = &cfg.url {
        return PgConnectOptions::from_str(url).context("parse DATABASE_URL");
    }
    let ssl_mode = PgSslMode::from_str(&cfg.ssl_mode)
        .with_context(|| format!("unknown DB_SSLMODE {:?}", cfg.ssl_mode))?;
    Ok(PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.name)
        .ssl_mode(ssl_mode))
}

pub fn pool_options(cfg: &DbConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(cfg.max_open_conns.max(1))
        // sqlx has no idle ceiling; DB_MAX_IDLE_CONNS becomes the number of
        // connections kept open (a floor), capped at the max.
        .min_connections(cfg.max_idle_conns.min(cfg.max_open_conns))
}

pub async fn connect(cfg: &DbConfig) -> anyhow::Result<PgPool> {
    let pool = pool_options(cfg)
        .connect_with(connect_options(cfg)?)
        .await
        .context("connect to database")?;
    tracing::info!(
        max_connections = cfg.max_open_conns,
        min_connections = cfg.max_idle_conns,
        "database pool ready"
    );
    Ok(pool)
}

/// Applies the embedded schema. The conversation resolver relies on its
/// unique pair constraint, so a failure here aborts startup.
pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    tracing::info!("migrations applied");
    Ok(())
}
