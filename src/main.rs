mod config;
mod error;
mod handlers;
mod models;
mod server;
mod services;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use config::Config;
use handlers::{ExercisePlanner, FoodDetector};
use server::{create_router, AppState};
use services::{GeminiService, GenerativeModel};

#[tokio::main]
async fn main() -> Result<()> {
    // .env has to be loaded before the logger reads RUST_LOG
    dotenv().ok();
    env_logger::init();

    log::info!("🚀 Starting calorie coach API...");

    let config = Config::from_env()?;
    log::info!(
        "✅ Configuration loaded (model: {}, extraction: {:?}, missing profile fields: {:?})",
        config.model,
        config.extraction,
        config.missing_fields
    );

    let gemini: Arc<dyn GenerativeModel> = Arc::new(GeminiService::new(&config));
    log::info!("✅ Gemini service initialized with model: {}", config.model);

    let state = Arc::new(AppState {
        food_detector: FoodDetector::new(gemini.clone(), config.extraction),
        exercise_planner: ExercisePlanner::new(gemini, config.extraction, config.missing_fields),
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    log::info!("🌐 Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("❌ Failed to listen for shutdown signal: {}", e);
            }
            log::info!("🛑 Shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
