//! Common helpers for end-to-end tests.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{COOKIE, HOST, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use time::OffsetDateTime;
use tower::ServiceExt;

use crate::auth::COOKIE_SCHEME;
use crate::config::HostEnvironment;
use crate::configuration::Configuration;
use crate::testing::CapturedLogs;
use crate::{Services, Startup, mvc};

pub const ISSUER: &str = "X";
pub const SECRET: &str = "secret";
/// Host used for requests that do not name one.
pub const HOST_NAME: &str = "example.com";

/// A composed application with captured log sinks.
pub struct TestApp {
    router: Router,
    services: Services,
    runtime: tokio::runtime::Runtime,
    /// Everything the primary sink wrote.
    pub primary_logs: CapturedLogs,
    /// Everything the secondary sink wrote.
    pub secondary_logs: CapturedLogs,
}

/// A fully buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    #[must_use]
    pub fn header(&self, name: impl axum::http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    /// An application configured with the test issuer and key.
    #[must_use]
    pub fn new(environment: HostEnvironment) -> Self {
        Self::with_configuration(
            environment,
            &[("Tokens:Issuer", ISSUER), ("Tokens:Key", SECRET)],
        )
    }

    #[must_use]
    pub fn with_configuration(environment: HostEnvironment, pairs: &[(&str, &str)]) -> Self {
        let primary_logs = CapturedLogs::default();
        let secondary_logs = CapturedLogs::default();

        let configuration =
            Configuration::from_pairs(pairs.iter().copied()).expect("Failed to load configuration");
        let services = Startup::new(configuration)
            .with_log_writers(primary_logs.sink_writer(), secondary_logs.sink_writer())
            .configure_services()
            .expect("Failed to configure services");

        let routes = mvc::router(Arc::clone(&services.authentication))
            .route("/boom", get(boom))
            .route("/report", get(report));
        let router = Startup::configure(&services, routes, &environment, Some(443));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create runtime");

        Self {
            router,
            services,
            runtime,
            primary_logs,
            secondary_logs,
        }
    }

    /// Send a request and buffer the response.
    ///
    /// The request runs on this thread with the application's logger as the
    /// default, so everything it logs reaches the captured sinks.
    #[must_use]
    pub fn send(&self, request: Request<Body>) -> TestResponse {
        let router = self.router.clone();
        self.in_scope(|| {
            self.runtime.block_on(async move {
                let response = router.oneshot(request).await.expect("Router is infallible");
                let status = response.status();
                let headers = response.headers().clone();
                let bytes = to_bytes(response.into_body(), usize::MAX)
                    .await
                    .expect("Failed to read body");
                TestResponse {
                    status,
                    headers,
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                }
            })
        })
    }

    /// Run `f` with the application's logger as the default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.services.logger.in_scope(f)
    }

    /// GET over HTTPS.
    #[must_use]
    pub fn get_https(&self, path: &str) -> TestResponse {
        self.send(https_request(path).body(Body::empty()).expect("request"))
    }

    /// A session cookie for `subject`, as a `Cookie` request header value.
    #[must_use]
    pub fn session_cookie(&self, subject: &str) -> String {
        let handler = self
            .services
            .authentication
            .cookie(COOKIE_SCHEME)
            .expect("cookie scheme is registered");
        let jar = handler.sign_in(handler.jar(), subject, OffsetDateTime::now_utc(), true);

        let response = (jar, ()).into_response();
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("sign-in sets a cookie");
        set_cookie
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// A request builder for `https://example.com{path}`.
#[must_use]
pub fn https_request(path: &str) -> axum::http::request::Builder {
    Request::builder().uri(format!("https://{HOST_NAME}{path}"))
}

/// A plain-HTTP request builder for `path` with a `Host` header.
#[must_use]
pub fn http_request(path: &str, host: &str) -> axum::http::request::Builder {
    Request::builder().uri(path).header(HOST, host)
}

/// Attach a session cookie.
#[must_use]
pub fn with_cookie(builder: axum::http::request::Builder, cookie: &str) -> axum::http::request::Builder {
    builder.header(COOKIE, cookie)
}

#[derive(Serialize)]
struct TokenClaims<'a> {
    sub: &'a str,
    iss: &'a str,
    aud: &'a str,
    exp: i64,
}

/// An HS256 token for subject `alice`, valid for an hour.
#[must_use]
pub fn token(secret: &str, issuer: &str, audience: &str) -> String {
    let claims = TokenClaims {
        sub: "alice",
        iss: issuer,
        aud: audience,
        exp: OffsetDateTime::now_utc().unix_timestamp() + 3600,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

async fn boom() -> &'static str {
    panic!("inventory count went negative")
}

/// A body large enough to be worth compressing.
async fn report() -> String {
    "quarterly totals line\n".repeat(200)
}
