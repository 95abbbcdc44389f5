use std::sync::Arc;

use santier_backoffice::api::{self, AppState};
use santier_backoffice::{
    create_pool, AppConfig, CostService, HttpAiGateway, PricingService, ReconciliationService,
    WorkLogService,
};
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    let pool = create_pool(&config.database.url).await?;
    info!("Database pool created");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied");

    let ai = Arc::new(HttpAiGateway::new(&config.ai));
    if config.ai.api_key.is_none() {
        info!("AI API key missing: extraction, matching and market search are disabled");
    }

    let state = AppState {
        reconciliation: Arc::new(ReconciliationService::new(
            pool.clone(),
            ai.clone(),
            config.ai.clone(),
        )),
        pricing: Arc::new(PricingService::new(
            pool.clone(),
            ai,
            config.ai.clone(),
            config.pricing.clone(),
        )),
        costs: Arc::new(CostService::new(pool.clone())),
        worklog: Arc::new(WorkLogService::new(pool)),
    };

    let app = api::router(state).layer(ServiceBuilder::new());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
