//! HTTP server for the marketplace API.
//!
//! All routes live under `/api`. Request bodies and responses are camelCase
//! JSON; failures are rendered as `ErrorResponse`.

use crate::apis;
use axum::{
	extract::DefaultBodyLimit,
	http::{header, HeaderValue, Method},
	routing::{get, post},
	Router,
};
use market_config::ApiConfig;
use market_core::MarketEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<MarketEngine>,
}

/// Builds the CORS layer: permissive unless origins are configured.
fn cors_layer(api_config: &ApiConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
	let Some(cors) = &api_config.cors else {
		return Ok(CorsLayer::permissive());
	};

	let origins = cors
		.allowed_origins
		.iter()
		.map(|origin| HeaderValue::from_str(origin))
		.collect::<Result<Vec<_>, _>>()?;

	Ok(CorsLayer::new()
		.allow_origin(origins)
		.allow_methods([Method::GET, Method::POST])
		.allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

/// Builds the `/api` router.
pub fn router(
	engine: Arc<MarketEngine>,
	api_config: &ApiConfig,
) -> Result<Router, Box<dyn std::error::Error>> {
	let app_state = AppState { engine };

	let api = Router::new()
		.route(
			"/order-forms",
			post(apis::order_forms::issue_order_form).get(apis::order_forms::list_order_forms),
		)
		.route("/order-forms/{id}", get(apis::order_forms::get_order_form))
		.route(
			"/order-forms/{id}/accept",
			post(apis::order_forms::accept_order_form),
		)
		.route(
			"/order-forms/{id}/reject",
			post(apis::order_forms::reject_order_form),
		)
		.route("/order-forms/{id}/checkout", post(apis::checkout::checkout))
		.route("/orders", get(apis::orders::list_orders))
		.route("/orders/{id}", get(apis::orders::get_order))
		.route(
			"/orders/{id}/logistics",
			post(apis::orders::select_logistics),
		)
		.route("/logistics", get(apis::logistics::list_companies))
		.route(
			"/threads/{id}/messages",
			get(apis::threads::thread_messages).post(apis::threads::post_message),
		);

	Ok(Router::new()
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config)?)
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(app_state))
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<MarketEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, &api_config)?;

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Market API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}
