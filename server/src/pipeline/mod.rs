//! HTTP request pipeline.
//!
//! The pipeline is an ordered list of [`PipelineStage`]s chosen from the host
//! environment, turned into tower layers around the MVC router.
//!
//! # Invariants
//! - Exactly one of `DeveloperExceptionPage` and `Hsts` is present, and it
//!   is the first stage.
//! - `HttpsRedirection` runs before `ResponseCompression`, which runs before
//!   `Mvc`.
//! - HTTPS responses are only compressed when `enable_for_https` is set.
//! - `Mvc` is the last stage.
//! - A panic that escapes every stage still yields an empty 500.

pub mod exception_page;
pub mod hsts;
pub mod https_redirection;
pub mod request_info;

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::ACCEPT_ENCODING;
use axum::middleware::Next;
use axum::response::Response;
use axum::{Router, middleware};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;

use crate::config::HostEnvironment;
use crate::configuration::{Configuration, ConfigurationError};

pub use exception_page::PanicReport;
pub use hsts::HstsOptions;
pub use https_redirection::{HttpsRedirection, HttpsRedirectionOptions};
pub use request_info::RequestScheme;

/// Configuration key that turns on compression of HTTPS responses.
pub const ENABLE_FOR_HTTPS_KEY: &str = "ResponseCompression:EnableForHttps";

/// Codecs offered to clients that accept them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCompressionOptions {
    pub gzip: bool,
    pub brotli: bool,
    /// Also compress responses to HTTPS requests.
    pub enable_for_https: bool,
}

impl Default for ResponseCompressionOptions {
    fn default() -> Self {
        Self {
            gzip: true,
            brotli: true,
            enable_for_https: false,
        }
    }
}

impl ResponseCompressionOptions {
    /// Defaults with `ResponseCompression:EnableForHttps` applied.
    ///
    /// # Errors
    /// Returns `ConfigurationError::InvalidValue` if the key is not a boolean.
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, ConfigurationError> {
        let mut options = Self::default();
        if let Some(enabled) = configuration.get_bool(ENABLE_FOR_HTTPS_KEY)? {
            options.enable_for_https = enabled;
        }
        Ok(options)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub hsts: HstsOptions,
    pub https_redirection: HttpsRedirectionOptions,
    pub compression: ResponseCompressionOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    DeveloperExceptionPage,
    Hsts(HstsOptions),
    HttpsRedirection(HttpsRedirectionOptions),
    ResponseCompression(ResponseCompressionOptions),
    Mvc,
}

impl PipelineStage {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DeveloperExceptionPage => "DeveloperExceptionPage",
            Self::Hsts(_) => "Hsts",
            Self::HttpsRedirection(_) => "HttpsRedirection",
            Self::ResponseCompression(_) => "ResponseCompression",
            Self::Mvc => "Mvc",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestPipeline {
    stages: Vec<PipelineStage>,
}

impl RequestPipeline {
    /// Stages for `environment`, outermost first.
    #[must_use]
    pub fn for_environment(environment: &HostEnvironment, options: PipelineOptions) -> Self {
        let first = if environment.is_development() {
            PipelineStage::DeveloperExceptionPage
        } else {
            PipelineStage::Hsts(options.hsts)
        };
        Self {
            stages: vec![
                first,
                PipelineStage::HttpsRedirection(options.https_redirection),
                PipelineStage::ResponseCompression(options.compression),
                PipelineStage::Mvc,
            ],
        }
    }

    #[must_use]
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    /// Wrap `mvc` in the pipeline's layers.
    ///
    /// Layers are applied innermost first, so the first stage sees each
    /// request before any other.
    #[must_use]
    pub fn build(self, mvc: Router) -> Router {
        let names: Vec<&str> = self.stages.iter().map(PipelineStage::name).collect();
        tracing::debug!(stages = ?names, "building request pipeline");

        let app = self.stages.into_iter().rev().fold(mvc, |app, stage| match stage {
            PipelineStage::Mvc => app,
            PipelineStage::ResponseCompression(options) => {
                let app = app.layer(
                    CompressionLayer::new()
                        .gzip(options.gzip)
                        .br(options.brotli),
                );
                if options.enable_for_https {
                    app
                } else {
                    app.layer(middleware::from_fn(skip_https_compression))
                }
            }
            PipelineStage::HttpsRedirection(options) => app.layer(middleware::from_fn_with_state(
                Arc::new(HttpsRedirection::new(options)),
                https_redirection::redirect_to_https,
            )),
            PipelineStage::Hsts(options) => app.layer(middleware::from_fn_with_state(
                Arc::new(options),
                hsts::enforce_hsts,
            )),
            PipelineStage::DeveloperExceptionPage => {
                exception_page::install_panic_capture();
                app.layer(CatchPanicLayer::custom(
                    exception_page::developer_exception_response,
                ))
            }
        });

        app.layer(CatchPanicLayer::custom(exception_page::opaque_server_error))
    }
}

/// Drop `Accept-Encoding` from HTTPS requests so the compression layer
/// passes their responses through unchanged.
async fn skip_https_compression(mut request: Request, next: Next) -> Response {
    if request_info::request_scheme(&request) == RequestScheme::Https {
        request.headers_mut().remove(ACCEPT_ENCODING);
    }
    next.run(request).await
}
