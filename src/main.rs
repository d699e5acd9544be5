mod config;
mod db_types;
mod error;
mod handlers;
mod store;
mod sync;
mod types;
mod utils;
mod vapi;
mod vapi_types;

use crate::config::Config;
use crate::error::handle_error;
use crate::store::JsonFileStore;
use crate::types::AppState;
use crate::vapi::VapiClient;

use axum::{routing::get, Router};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

pub mod consts {
    pub const MODEL_PROVIDER: &str = "openai";
    pub const MODEL: &str = "chatgpt-4o-latest";
    pub const VOICE_PROVIDER: &str = "11labs";
    pub const VOICE_ID: &str = "DwwuoY7Uz8AP8zrY5TAo";
    pub const END_CALL_MESSAGE: &str = "Thank you for calling. Goodbye!";
    pub const MAX_DURATION_SECONDS: u32 = 300;
    pub const PHONE_NUMBER_PROVIDER: &str = "vapi";
    pub const PHONE_NUMBER_AREA_CODE: &str = "207";
    pub const DEFAULT_VAPI_BASE_URL: &str = "https://api.vapi.ai";
    pub const DEFAULT_DATA_PATH: &str = "data.json";
    pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
}

pub fn app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/assistants",
            get(handlers::list_assistants)
                .post(handlers::create_assistant)
                .patch(handlers::update_assistant)
                .delete(handlers::delete_assistant),
        )
        .route("/assistants/:id", get(handlers::get_assistant))
        .route(
            "/phone-numbers",
            get(handlers::list_phone_numbers)
                .post(handlers::create_phone_number)
                .patch(handlers::update_phone_number)
                .delete(handlers::delete_phone_number),
        )
        .route("/phone-numbers/:id", get(handlers::get_phone_number))
        .route("/", get(|| async { "Hello World" }))
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; the process environment may already be populated.
    let dotenv = dotenvy::dotenv();
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("vapi_rs", tracing_subscriber::filter::LevelFilter::DEBUG),
        ]));
    tracing::subscriber::set_global_default(subscriber).expect("tracing subscriber already set");
    if let Err(e) = dotenv {
        info!(error=%e, "no .env loaded");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            handle_error(e).await;
            std::process::exit(1);
        }
    };
    if config.vapi_api_key.is_none() {
        warn!("VAPI_API_KEY not set; every Vapi call will fail");
    }

    let http_client = reqwest::Client::new();
    let store = JsonFileStore::new(&config.data_path);
    info!(path=%store.path().display(), "using data file");
    let gateway = VapiClient::new(http_client, &config.vapi_base_url, config.vapi_api_key);

    let app_state = Arc::new(AppState {
        store: Arc::new(store),
        gateway: Arc::new(gateway),
    });

    let server = match axum::Server::try_bind(&config.bind_addr) {
        Ok(builder) => builder.serve(app(app_state).into_make_service()),
        Err(e) => {
            handle_error(e).await;
            std::process::exit(1);
        }
    };
    info!(addr=%server.local_addr(), "server listening");
    if let Err(e) = server.await {
        handle_error(e).await;
        std::process::exit(1);
    }
}
