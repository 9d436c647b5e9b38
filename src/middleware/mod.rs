//! Multipart form middleware.
//!
//! [`process`] is an axum `from_fn_with_state` middleware. For a
//! `multipart/form-data` request it reads the whole body, decodes bracketed
//! field names into [`NestedTree`](crate::form::NestedTree)s and hands them
//! to the next handler as a [`FormContext`]. A failed parse answers the
//! request with a client error and never reaches the handler.
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{Router, middleware::from_fn_with_state, routing::post};
//! use formtree::middleware::{FormContext, MultipartOptions, process};
//! use formtree::tokenizer::UploadLimits;
//!
//! async fn handler(form: FormContext) -> String {
//!     format!("{:?}", form.body)
//! }
//!
//! let options = Arc::new(MultipartOptions::new(UploadLimits::default()));
//! let app: Router = Router::new()
//!     .route("/", post(handler))
//!     .layer(from_fn_with_state(options, process));
//! ```

mod context;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::cleanup::{self, DeletePolicy, NotifyOnFinish};
use crate::config::UploadConfig;
use crate::form::parse_form;
use crate::observability::Metrics;
use crate::tokenizer::{InboundBody, MulterSource, UploadLimits};

pub use context::FormContext;

/// Shared, immutable settings of the middleware.
#[derive(Debug, Clone)]
pub struct MultipartOptions {
    pub limits: UploadLimits,
    pub delete_on_finish: DeletePolicy,
    pub metrics: Arc<Metrics>,
}

impl MultipartOptions {
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            limits,
            delete_on_finish: DeletePolicy::None,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn from_config(upload: &UploadConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            limits: upload.to_upload_limits(),
            delete_on_finish: upload.delete_on_finish.clone(),
            metrics,
        }
    }

    pub fn with_delete_on_finish(mut self, policy: DeletePolicy) -> Self {
        self.delete_on_finish = policy;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Parses multipart bodies into a [`FormContext`] before calling `next`.
///
/// Skips requests that were already processed by an earlier layer, `GET` and
/// `HEAD` requests, and anything that is not `multipart/form-data`; those
/// reach `next` with an empty context unless one is already present.
pub async fn process(
    State(options): State<Arc<MultipartOptions>>,
    mut req: Request,
    next: Next,
) -> Response {
    if req
        .extensions()
        .get::<FormContext>()
        .is_some_and(|ctx| ctx.processed)
    {
        debug!("Form already processed, passing through");
        return next.run(req).await;
    }

    let content_type = if crate::api::utils::is_bodyless(req.method()) {
        None
    } else {
        crate::api::utils::multipart_content_type(req.headers())
    };

    let Some(content_type) = content_type else {
        if req.extensions().get::<FormContext>().is_none() {
            req.extensions_mut().insert(FormContext::default());
        }
        return next.run(req).await;
    };

    let (mut parts, body) = req.into_parts();
    let inbound = InboundBody::new(body);
    let mut source = MulterSource::start(&content_type, &inbound, options.limits.clone());

    let form = match parse_form(&mut source, &inbound).await {
        Ok(form) => form,
        Err(err) => {
            options.metrics.form_failed();
            warn!(
                method = %parts.method,
                uri = %parts.uri,
                code = err.code(),
                error = %err,
                "Rejected multipart request"
            );
            return ApiError::from(err).into_response();
        }
    };

    let file_count = form.files.files().len();
    let bytes_read = inbound.bytes_read().await;
    options.metrics.form_parsed(file_count);
    info!(
        method = %parts.method,
        uri = %parts.uri,
        files = file_count,
        bytes = bytes_read,
        "Parsed multipart form"
    );

    let paths = cleanup::collect_paths(&options.delete_on_finish, &form.files);
    parts.extensions.insert(FormContext::parsed(form));

    let response = next.run(Request::from_parts(parts, Body::empty())).await;

    match cleanup::schedule(paths, options.metrics.clone()) {
        Some((signal, _task)) => {
            response.map(|body| Body::new(NotifyOnFinish::new(body, signal)))
        }
        None => response,
    }
}
