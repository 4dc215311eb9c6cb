use assessment_backend::{
    app::{build_router, RouterLimits},
    config::{get_config, init_config, LogFormat},
    database::pool::{create_pool, run_migrations},
    services::recommendation_rules::RecommendationRules,
    AppState,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let rules = RecommendationRules::load(config.recommendation_rules_path.as_deref())?;
    info!(rules = rules.len(), "recommendation rules loaded");

    let pool = create_pool().await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool, rules);

    {
        let attempts = app_state.attempt_service.clone();
        let grace_minutes = config.abandon_grace_minutes;
        tokio::spawn(async move {
            loop {
                match attempts.abandon_expired(grace_minutes).await {
                    Ok(0) => {}
                    Ok(n) => info!(abandoned = n, "expired attempts closed"),
                    Err(e) => tracing::error!(error = ?e, "attempt sweeper error"),
                }
                tokio::time::sleep(SWEEP_INTERVAL).await;
            }
        });
    }

    let app = build_router(
        app_state,
        RouterLimits {
            admin_rps: config.admin_rps,
            public_rps: config.public_rps,
        },
    );

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
