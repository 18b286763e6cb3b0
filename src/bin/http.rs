#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context;
    use timeli::persistence::open_store;
    use timeli::{AppConfig, TimetableRenderer, http_api, logging};

    logging::init_tracing();

    let config = AppConfig::from_env()?;
    let store = open_store(&config.database)
        .with_context(|| format!("opening database {}", config.database))?;
    let renderer = TimetableRenderer::new(&config.render_config(), Arc::new(config.converter()))
        .context("loading timetable templates")?;
    tracing::info!(
        backend = config.database.backend(),
        database = %config.database,
        templates = renderer.registry().descriptors().len(),
        "starting timeli"
    );

    let state = http_api::AppState::new(store, renderer);
    http_api::serve(config.http_addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
