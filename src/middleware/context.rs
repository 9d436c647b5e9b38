use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

use crate::form::{NestedTree, ParsedForm};

/// Per-request form data, stored in the request extensions.
///
/// `processed` marks a request whose body was already consumed by an earlier
/// [`process`](super::process) layer. Handlers extract this directly; a
/// request that never went through the middleware yields empty trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormContext {
    pub processed: bool,
    pub body: NestedTree,
    pub files: NestedTree,
}

impl FormContext {
    pub fn parsed(form: ParsedForm) -> Self {
        Self {
            processed: true,
            body: form.body,
            files: form.files,
        }
    }
}

impl<S> FromRequestParts<S> for FormContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<FormContext>()
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_missing_context_extracts_empty() {
        let (mut parts, _) = Request::new(()).into_parts();
        let ctx = FormContext::from_request_parts(&mut parts, &()).await.unwrap();

        assert!(!ctx.processed);
        assert_eq!(ctx.body, NestedTree::empty());
        assert_eq!(ctx.files, NestedTree::empty());
    }

    #[tokio::test]
    async fn test_extracts_stored_context() {
        let (mut parts, _) = Request::new(()).into_parts();
        let mut form = ParsedForm::default();
        form.body = NestedTree::Scalar("x".into());
        parts.extensions.insert(FormContext::parsed(form));

        let ctx = FormContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(ctx.processed);
        assert_eq!(ctx.body.as_str(), Some("x"));
    }
}
