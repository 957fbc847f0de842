use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Layers request tracing over `router` and serves it on `127.0.0.1:port`,
/// mirroring `nest::ApiBuilder::serve`'s shape.
///
/// # Errors
/// Returns an error if the port can't be bound or the server loop fails.
pub async fn serve(router: Router, port: u16) -> anyhow::Result<()> {
	let app = router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
	let listener = TcpListener::bind(("127.0.0.1", port)).await?;
	tracing::info!(addr = %listener.local_addr()?, "listening");
	axum::serve(listener, app).await?;
	Ok(())
}

/// Same as `serve`, but stops accepting new connections once `stop` fires
/// (§5: every blocking call on the hot path observes the stop context),
/// mirroring `apps/servers/file_host`'s `with_graceful_shutdown` use.
///
/// # Errors
/// Returns an error if the port can't be bound or the server loop fails.
pub async fn serve_with_shutdown(router: Router, port: u16, stop: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
	let app = router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
	let listener = TcpListener::bind(("127.0.0.1", port)).await?;
	tracing::info!(addr = %listener.local_addr()?, "listening");
	axum::serve(listener, app).with_graceful_shutdown(async move { stop.cancelled().await }).await?;
	Ok(())
}
