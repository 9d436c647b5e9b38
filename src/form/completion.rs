//! Completion state machine.
//!
//! Folds tokenizer events into exactly one outcome per request. The state
//! only moves forward (`Pending` to `Succeeded` or `Failed`); events that
//! arrive after that are dropped.

use tracing::debug;

use super::aggregator::EntryAggregator;
use super::decoder::decode;
use super::entry::FileHandle;
use super::error::FormError;
use super::tree::NestedTree;
use crate::tokenizer::{InboundBody, PartEvent, PartSource, TokenizerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Pending,
    Succeeded,
    Failed,
}

/// Decoded body and files trees of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedForm {
    pub body: NestedTree,
    pub files: NestedTree,
}

pub type Outcome = Result<ParsedForm, FormError>;

#[derive(Debug)]
pub struct Completion {
    state: CompletionState,
    fields: EntryAggregator,
    files: EntryAggregator,
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

impl Completion {
    pub fn new() -> Self {
        Self {
            state: CompletionState::Pending,
            fields: EntryAggregator::new(),
            files: EntryAggregator::new(),
        }
    }

    pub fn state(&self) -> CompletionState {
        self.state
    }

    fn is_pending(&self) -> bool {
        self.state == CompletionState::Pending
    }

    pub fn on_field(&mut self, name: String, value: String) {
        if !self.is_pending() {
            debug!(field = %name, "Ignoring field after completion");
            return;
        }
        self.fields.record(name, value);
    }

    pub fn on_file(&mut self, name: String, handle: FileHandle) {
        if !self.is_pending() {
            debug!(field = %name, "Ignoring file after completion");
            return;
        }
        self.files.record(name, handle);
    }

    /// Fails the request. Returns `None` if an outcome was already produced.
    pub fn on_error(&mut self, err: TokenizerError) -> Option<FormError> {
        if !self.is_pending() {
            debug!(error = %err, "Ignoring tokenizer error after completion");
            return None;
        }

        self.state = CompletionState::Failed;
        Some(FormError::from(err))
    }

    /// Decodes everything recorded so far. Returns `None` if an outcome was
    /// already produced.
    pub fn on_close(&mut self) -> Option<Outcome> {
        if !self.is_pending() {
            return None;
        }

        let fields = std::mem::take(&mut self.fields);
        let files = std::mem::take(&mut self.files);
        debug!(
            fields = fields.entry_count(),
            files = files.entry_count(),
            "Decoding form"
        );

        let decoded = decode(fields.into_flat_map()).and_then(|body| {
            decode(files.into_flat_map()).map(|files| ParsedForm { body, files })
        });

        match decoded {
            Ok(form) => {
                self.state = CompletionState::Succeeded;
                Some(Ok(form))
            }
            Err(err) => {
                self.state = CompletionState::Failed;
                Some(Err(err.into()))
            }
        }
    }

    pub fn handle(&mut self, event: PartEvent) -> Option<Outcome> {
        match event {
            PartEvent::Field { name, value } => {
                self.on_field(name, value);
                None
            }
            PartEvent::File { name, handle } => {
                self.on_file(name, handle);
                None
            }
            PartEvent::Error(err) => self.on_error(err).map(Err),
            PartEvent::Close => self.on_close(),
        }
    }
}

/// Runs `source` to its first terminal outcome.
///
/// A failure is returned only after `inbound` has been read to the end, so
/// the client never blocks on a request the server stopped reading. A source
/// that runs dry without closing is treated as closed.
pub async fn parse_form<S>(source: &mut S, inbound: &InboundBody) -> Outcome
where
    S: PartSource + ?Sized,
{
    let mut completion = Completion::new();

    loop {
        let event = source.next_event().await.unwrap_or(PartEvent::Close);
        let Some(outcome) = completion.handle(event) else {
            continue;
        };

        if outcome.is_err() && inbound.is_readable().await {
            let drained = inbound.drain().await;
            debug!(drained, "Drained request body after failed parse");
        }

        return outcome;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::DecodeError;
    use crate::tokenizer::Limit;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    struct Scripted {
        events: VecDeque<PartEvent>,
        pulled: usize,
    }

    impl Scripted {
        fn new(events: Vec<PartEvent>) -> Self {
            Self {
                events: events.into(),
                pulled: 0,
            }
        }
    }

    #[async_trait]
    impl PartSource for Scripted {
        async fn next_event(&mut self) -> Option<PartEvent> {
            self.pulled += 1;
            self.events.pop_front()
        }
    }

    fn field(name: &str, value: &str) -> PartEvent {
        PartEvent::Field {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn file(name: &str, filename: &str) -> PartEvent {
        PartEvent::File {
            name: name.to_string(),
            handle: FileHandle {
                field_name: name.to_string(),
                original_filename: filename.to_string(),
                path: PathBuf::from("/tmp").join(filename),
                size: 1,
                content_type: None,
            },
        }
    }

    fn limit_error() -> TokenizerError {
        TokenizerError::LimitExceeded {
            limit: Limit::FilesSize,
            max: 512,
        }
    }

    #[test]
    fn test_close_decodes_both_trees() {
        let mut completion = Completion::new();
        completion.on_field("user".into(), "Tobi".into());
        completion.on_field("user".into(), "Loki".into());
        assert!(completion.handle(file("docs[foo]", "foo.txt")).is_none());

        let form = completion.on_close().unwrap().unwrap();
        assert_eq!(completion.state(), CompletionState::Succeeded);
        assert_eq!(
            serde_json::to_value(&form.body).unwrap(),
            json!({ "user": ["Tobi", "Loki"] })
        );
        let users = form.body.get("user").and_then(NestedTree::as_sequence).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].as_str(), Some("Loki"));
        assert_eq!(
            form.files
                .get("docs")
                .and_then(|docs| docs.get("foo"))
                .and_then(NestedTree::as_file)
                .map(|h| h.original_filename.as_str()),
            Some("foo.txt")
        );
    }

    #[test]
    fn test_only_first_terminal_event_counts() {
        let mut completion = Completion::new();
        assert!(completion.on_error(limit_error()).is_some());
        assert_eq!(completion.state(), CompletionState::Failed);

        assert!(completion.on_error(limit_error()).is_none());
        assert!(completion.on_close().is_none());
        assert_eq!(completion.state(), CompletionState::Failed);
    }

    #[test]
    fn test_error_after_close_is_ignored() {
        let mut completion = Completion::new();
        assert!(matches!(completion.on_close(), Some(Ok(_))));
        assert!(completion.on_error(limit_error()).is_none());
        assert!(completion.on_close().is_none());
        assert_eq!(completion.state(), CompletionState::Succeeded);
    }

    #[test]
    fn test_decode_conflict_fails_with_bad_request() {
        let mut completion = Completion::new();
        completion.on_field("a[b]".into(), "x".into());
        completion.on_field("a[b][c]".into(), "y".into());

        let err = completion.on_close().unwrap().unwrap_err();
        assert!(matches!(err, FormError::Decode(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(completion.state(), CompletionState::Failed);
    }

    #[test]
    fn test_conflicting_file_names_fail_decode() {
        let mut completion = Completion::new();
        completion.on_field("user".into(), "Tobi".into());
        assert!(completion.handle(file("docs[a]", "a.txt")).is_none());
        assert!(completion.handle(file("docs[a][b]", "b.txt")).is_none());

        let err = completion.on_close().unwrap().unwrap_err();
        assert!(matches!(
            &err,
            FormError::Decode(DecodeError::Conflict { name, .. }) if name == "docs[a][b]"
        ));
        assert_eq!(err.code(), "DECODE_CONFLICT");
        assert_eq!(completion.state(), CompletionState::Failed);
    }

    #[test]
    fn test_empty_form_yields_empty_mappings() {
        let mut completion = Completion::new();
        let form = completion.on_close().unwrap().unwrap();
        assert_eq!(form, ParsedForm::default());
        assert!(form.body.is_empty() && form.files.is_empty());
    }

    #[tokio::test]
    async fn test_parse_form_stops_at_first_terminal_event() {
        let mut source = Scripted::new(vec![
            field("user", "Tobi"),
            PartEvent::Close,
            PartEvent::Error(limit_error()),
        ]);
        let inbound = InboundBody::new(Body::empty());

        let form = parse_form(&mut source, &inbound).await.unwrap();
        assert_eq!(form.body.get("user").and_then(NestedTree::as_str), Some("Tobi"));
        assert_eq!(source.pulled, 2);
    }

    #[tokio::test]
    async fn test_parse_form_drains_before_reporting_error() {
        let trailing = vec![b'.'; 30 * 1024];
        let inbound = InboundBody::new(Body::from(trailing));
        let mut source = Scripted::new(vec![
            field("user[name]", "Tobi"),
            PartEvent::Error(TokenizerError::malformed("expected alphabetic character")),
            PartEvent::Error(limit_error()),
        ]);

        let err = parse_form(&mut source, &inbound).await.unwrap_err();

        assert!(matches!(err, FormError::Tokenizer(TokenizerError::Malformed { .. })));
        assert!(!inbound.is_readable().await);
        assert_eq!(inbound.bytes_read().await, 30 * 1024);
    }

    #[tokio::test]
    async fn test_parse_form_treats_exhausted_source_as_close() {
        let mut source = Scripted::new(vec![field("species", "ferret")]);
        let inbound = InboundBody::new(Body::empty());

        let form = parse_form(&mut source, &inbound).await.unwrap();
        assert_eq!(
            serde_json::to_value(&form.body).unwrap(),
            json!({ "species": "ferret" })
        );
    }
}
