use std::net::SocketAddr;

use axum::{middleware::from_extractor_with_state, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::jwt::AuthUser;
use crate::state::AppState;
use crate::{
    auth, boards, bots, common_codes, deposits, notices, status, symbols, uploads, users,
};

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.upload.body_limit();

    let public = Router::new()
        .merge(status::public_router())
        .merge(auth::public_router());

    let protected = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(common_codes::router())
        .merge(boards::router())
        .merge(notices::router(body_limit))
        .merge(uploads::router(body_limit))
        .merge(symbols::router())
        .merge(bots::router())
        .merge(deposits::router())
        .merge(status::router())
        .route_layer(from_extractor_with_state::<AuthUser, AppState>(state.clone()));

    Router::new()
        .nest("/api", public.merge(protected))
        .nest_service(
            &state.config.upload.public_prefix,
            ServeDir::new(&state.config.upload.dir),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
