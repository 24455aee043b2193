use anyhow::Result;
use extratosync::{fetch, normalize, upload};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Full pipeline, stage by stage: download the statement spreadsheets,
/// normalize and merge them, upsert the merged rows. Each stage also exists
/// as a standalone binary under `src/bin/`.
fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) fetch statements from Drive ──────────────────────────────
    fetch::run()?;

    // ─── 3) normalize and merge ──────────────────────────────────────
    normalize::run()?;

    // ─── 4) upsert into the sink ─────────────────────────────────────
    upload::run()?;

    info!("all done");
    Ok(())
}
