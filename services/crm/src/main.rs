use sea_orm::Database;
use tracing::info;

use leadflow_core::config::Config;
use leadflow_core::tracing::init_tracing;

use leadflow_crm::config::CrmConfig;
use leadflow_crm::router::build_router;
use leadflow_crm::scheduler::spawn_jobs;
use leadflow_crm::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = CrmConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let state = AppState {
        db,
        config: config.clone(),
    };

    // Background jobs
    let jobs = spawn_jobs(&state);

    // HTTP server
    let router = build_router(state);
    let http_addr = format!("0.0.0.0:{}", config.crm_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .expect("failed to bind");

    info!("crm service listening on {http_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("server error");

    for job in jobs {
        job.abort();
    }
    info!("crm service stopped");
}
