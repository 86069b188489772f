pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_route;
pub use state::AppState;

pub async fn run_server(state: AppState, config: config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = routes::create_route(state);

    let addr = config.listen_address();
    tracing::info!("messaging-service listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
