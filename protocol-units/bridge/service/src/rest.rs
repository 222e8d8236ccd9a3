use crate::bridge::Bridge;
use anyhow::{Context, Error};
use bridge_indexer_db::BridgeStore;
use bridge_util::Connector;
use poem::{
	get, handler, http::StatusCode, listener::TcpListener, middleware::Tracing, web::Data,
	Endpoint, EndpointExt, IntoResponse, Response, Route, Server,
};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Liveness source behind `/health`.
pub trait HealthCheck: Send + Sync {
	fn is_healthy(&self) -> bool;
}

impl<S, C> HealthCheck for Bridge<S, C>
where
	S: BridgeStore + 'static,
	C: Connector,
{
	fn is_healthy(&self) -> bool {
		Bridge::is_healthy(self)
	}
}

struct RestContext {
	health: Arc<dyn HealthCheck>,
}

pub struct BridgeRest {
	pub url: String,
	context: Arc<RestContext>,
}

impl BridgeRest {
	pub fn new(rest_listener_url: String, health: Arc<dyn HealthCheck>) -> Self {
		Self { url: rest_listener_url, context: Arc::new(RestContext { health }) }
	}

	pub fn run_service(&self) -> impl Future<Output = Result<(), Error>> + Send + 'static {
		info!("Starting bridge REST service at {}", self.url);
		let url = self.url.clone();
		let bridge_rest = self.create_routes();
		async move {
			Server::new(TcpListener::bind(url))
				.run(bridge_rest)
				.await
				.context("Bridge REST service failed")
		}
	}

	pub fn create_routes(&self) -> impl Endpoint + 'static {
		Route::new().at("/health", get(health_handler)).with(Tracing).data(self.context.clone())
	}
}

#[handler]
async fn health_handler(context: Data<&Arc<RestContext>>) -> Response {
	health_response(context.health.as_ref())
}

fn health_response(check: &dyn HealthCheck) -> Response {
	if check.is_healthy() {
		"OK".into_response()
	} else {
		"NOK".with_status(StatusCode::SERVICE_UNAVAILABLE).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, Ordering};

	struct Flag(AtomicBool);

	impl HealthCheck for Flag {
		fn is_healthy(&self) -> bool {
			self.0.load(Ordering::SeqCst)
		}
	}

	#[tokio::test]
	async fn health_follows_the_check() {
		let flag = Flag(AtomicBool::new(true));
		let response = health_response(&flag);
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.into_body().into_string().await.unwrap(), "OK");

		flag.0.store(false, Ordering::SeqCst);
		let response = health_response(&flag);
		assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(response.into_body().into_string().await.unwrap(), "NOK");
	}

	#[tokio::test]
	async fn routes_serve_health() {
		let rest = BridgeRest::new("127.0.0.1:0".to_string(), Arc::new(Flag(AtomicBool::new(false))));
		let routes = rest.create_routes();

		let request = poem::Request::builder().uri(poem::http::Uri::from_static("/health")).finish();
		let response = routes.get_response(request).await;
		assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

		let request = poem::Request::builder().uri(poem::http::Uri::from_static("/missing")).finish();
		assert_eq!(routes.get_response(request).await.status(), StatusCode::NOT_FOUND);
	}
}
