pub mod handlers;

use crate::cli::globals::GlobalArgs;
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    routing::{get, patch, post},
    Router,
};
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Shared state for the relay handlers: one upstream client plus the
/// upstream base URL and the configured session cookie name. The cookie is
/// an opaque blob; nothing here ever decodes it.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub client: Client,
    upstream_base: String,
    pub cookie_name: String,
}

impl GatewayState {
    /// Build the shared relay state.
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream URL has no host or an unsupported
    /// scheme, or the HTTP client cannot be constructed.
    pub fn new(upstream_url: &str, cookie_name: String) -> Result<Self> {
        let upstream_base = base_url(upstream_url)?;

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            upstream_base,
            cookie_name,
        })
    }

    /// Upstream URL for an operation path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.upstream_base, path)
    }
}

fn base_url(upstream_url: &str) -> Result<String> {
    let url = Url::parse(upstream_url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {}", scheme)),
        },
    };

    Ok(format!("{scheme}://{host}:{port}"))
}

/// Build the gateway router with all routes and middleware.
///
/// # Errors
///
/// Returns an error when the upstream URL or frontend origin is invalid.
pub fn app(globals: &GlobalArgs) -> Result<Router> {
    let state = Arc::new(GatewayState::new(
        &globals.upstream_url,
        globals.cookie_name.clone(),
    )?);

    let origin = frontend_origin(&globals.frontend_origin)?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_origin(AllowOrigin::exact(origin))
        .allow_credentials(true);

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .route("/auth/google", post(handlers::federated))
        .route(
            "/auth/me",
            get(handlers::me).patch(handlers::update_profile),
        )
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/change-password", patch(handlers::change_password))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| {
                        HeaderValue::from_str(Ulid::new().to_string().as_str()).ok()
                    },
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        ))
}

/// Start the gateway server.
///
/// # Errors
///
/// Returns an error if the router cannot be built or the listener fails.
pub async fn new(port: u16, globals: &GlobalArgs) -> Result<()> {
    let app = app(globals)?;

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_fills_in_default_ports() {
        assert_eq!(
            base_url("http://identity.internal").ok(),
            Some("http://identity.internal:80".to_string())
        );
        assert_eq!(
            base_url("https://identity.internal").ok(),
            Some("https://identity.internal:443".to_string())
        );
        assert_eq!(
            base_url("http://identity.internal:5000").ok(),
            Some("http://identity.internal:5000".to_string())
        );
    }

    #[test]
    fn base_url_rejects_unsupported_input() {
        assert!(base_url("ftp://identity.internal").is_err());
        assert!(base_url("not a url").is_err());
    }

    #[test]
    fn endpoint_joins_operation_paths() {
        let state = GatewayState::new("http://identity.internal:5000", "session".to_string())
            .expect("state");
        assert_eq!(
            state.endpoint("/auth/login"),
            "http://identity.internal:5000/auth/login"
        );
    }

    #[test]
    fn frontend_origin_strips_path() {
        let origin = frontend_origin("http://localhost:5173/app").expect("origin");
        assert_eq!(origin.to_str().ok(), Some("http://localhost:5173"));
    }
}
