use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{InboundBody, Limit, PartEvent, PartSource, TokenizerError};
use crate::form::FileHandle;

/// Limits enforced while reading parts.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Directory uploads are written to.
    pub upload_dir: PathBuf,
    /// Largest single upload.
    pub max_file_size: u64,
    /// Sum of all uploads in one request.
    pub max_files_size: u64,
    /// Sum of all text field bytes in one request.
    pub max_fields_size: u64,
    pub max_fields: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            upload_dir: std::env::temp_dir(),
            max_file_size: 100 * 1024 * 1024,
            max_files_size: 1024 * 1024 * 1024,
            max_fields_size: 2 * 1024 * 1024,
            max_fields: 1000,
        }
    }
}

/// [`PartSource`] reading a `multipart/form-data` body with `multer`.
///
/// Text parts become `Field` events. Parts carrying a filename are streamed
/// into `upload_dir` under a random name and become `File` events once fully
/// written.
pub struct MulterSource {
    multipart: Option<multer::Multipart<'static>>,
    startup_error: Option<TokenizerError>,
    limits: UploadLimits,
    files_size: u64,
    fields_size: u64,
    field_count: usize,
    finished: bool,
}

impl MulterSource {
    /// Starts reading `inbound`. A missing or invalid boundary is reported
    /// as the first event.
    pub fn start(content_type: &str, inbound: &InboundBody, limits: UploadLimits) -> Self {
        let (multipart, startup_error) = match multer::parse_boundary(content_type) {
            Ok(boundary) => (Some(multer::Multipart::new(inbound.stream(), boundary)), None),
            Err(err) => (None, Some(TokenizerError::from(err))),
        };

        Self {
            multipart,
            startup_error,
            limits,
            files_size: 0,
            fields_size: 0,
            field_count: 0,
            finished: false,
        }
    }

    async fn read_part(&mut self) -> Result<Option<PartEvent>, TokenizerError> {
        let Some(multipart) = self.multipart.as_mut() else {
            return Ok(None);
        };
        let Some(field) = multipart.next_field().await? else {
            return Ok(None);
        };

        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_owned) {
            Some(filename) => self.store_file(name, filename, field).await.map(Some),
            None => self.read_text(name, field).await.map(Some),
        }
    }

    async fn read_text(
        &mut self,
        name: String,
        mut field: multer::Field<'static>,
    ) -> Result<PartEvent, TokenizerError> {
        self.field_count += 1;
        if self.field_count > self.limits.max_fields {
            return Err(TokenizerError::LimitExceeded {
                limit: Limit::FieldCount,
                max: self.limits.max_fields as u64,
            });
        }

        let mut buf = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            self.fields_size += chunk.len() as u64;
            if self.fields_size > self.limits.max_fields_size {
                return Err(TokenizerError::LimitExceeded {
                    limit: Limit::FieldsSize,
                    max: self.limits.max_fields_size,
                });
            }
            buf.extend_from_slice(&chunk);
        }

        let value = String::from_utf8_lossy(&buf).into_owned();
        Ok(PartEvent::Field { name, value })
    }

    async fn store_file(
        &mut self,
        name: String,
        filename: String,
        mut field: multer::Field<'static>,
    ) -> Result<PartEvent, TokenizerError> {
        let content_type = field.content_type().map(ToString::to_string);
        let path = self.limits.upload_dir.join(stored_name(&filename));

        let io_error = |source| TokenizerError::Io {
            filename: filename.clone(),
            source,
        };

        let mut file = File::create(&path).await.map_err(io_error)?;
        let written = self.copy_upload(&mut field, &mut file, &filename).await;
        drop(file);

        let size = match written {
            Ok(size) => size,
            Err(err) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove partial upload");
                }
                return Err(err);
            }
        };

        self.files_size += size;
        debug!(field = %name, filename = %filename, size, path = %path.display(), "Stored upload");

        Ok(PartEvent::File {
            handle: FileHandle {
                field_name: name.clone(),
                original_filename: filename,
                path,
                size,
                content_type,
            },
            name,
        })
    }

    async fn copy_upload(
        &self,
        field: &mut multer::Field<'static>,
        file: &mut File,
        filename: &str,
    ) -> Result<u64, TokenizerError> {
        let io_error = |source| TokenizerError::Io {
            filename: filename.to_string(),
            source,
        };

        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if size > self.limits.max_file_size {
                return Err(TokenizerError::LimitExceeded {
                    limit: Limit::FileSize,
                    max: self.limits.max_file_size,
                });
            }
            if self.files_size + size > self.limits.max_files_size {
                return Err(TokenizerError::LimitExceeded {
                    limit: Limit::FilesSize,
                    max: self.limits.max_files_size,
                });
            }
            file.write_all(&chunk).await.map_err(io_error)?;
        }

        file.flush().await.map_err(io_error)?;
        Ok(size)
    }
}

#[async_trait]
impl PartSource for MulterSource {
    async fn next_event(&mut self) -> Option<PartEvent> {
        if self.finished {
            return None;
        }

        let event = match self.startup_error.take() {
            Some(err) => PartEvent::Error(err),
            None => match self.read_part().await {
                Ok(Some(event)) => return Some(event),
                Ok(None) => PartEvent::Close,
                Err(err) => PartEvent::Error(err),
            },
        };

        self.finished = true;
        self.multipart = None;
        Some(event)
    }
}

/// Random on-disk name keeping the client's extension.
fn stored_name(filename: &str) -> String {
    match Path::new(filename).extension() {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_string_lossy()),
        None => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tempfile::TempDir;

    const BOUNDARY: &str = "X-BOUNDARY";

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    fn field_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, filename: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n"
        )
    }

    fn closing() -> String {
        format!("--{BOUNDARY}--\r\n")
    }

    fn limits(dir: &TempDir) -> UploadLimits {
        UploadLimits {
            upload_dir: dir.path().to_path_buf(),
            ..UploadLimits::default()
        }
    }

    async fn collect(source: &mut MulterSource) -> Vec<PartEvent> {
        let mut events = Vec::new();
        while let Some(event) = source.next_event().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_stored_name_keeps_extension() {
        assert!(stored_name("foo.txt").ends_with(".txt"));
        assert!(!stored_name("README").contains('.'));
        assert!(!stored_name("../../etc/passwd.sh").contains('/'));
    }

    #[tokio::test]
    async fn test_fields_and_files_then_close() {
        let dir = TempDir::new().unwrap();
        let body = [
            field_part("user", "Tobi"),
            file_part("text", "foo.txt", "some text here"),
            closing(),
        ]
        .concat();
        let inbound = InboundBody::new(Body::from(body));
        let mut source = MulterSource::start(&content_type(), &inbound, limits(&dir));

        let events = collect(&mut source).await;
        assert_eq!(events.len(), 3);

        assert!(matches!(
            &events[0],
            PartEvent::Field { name, value } if name == "user" && value == "Tobi"
        ));

        let PartEvent::File { name, handle } = &events[1] else {
            panic!("expected file event, got {:?}", events[1]);
        };
        assert_eq!(name, "text");
        assert_eq!(handle.original_filename, "foo.txt");
        assert_eq!(handle.size, 14);
        assert_eq!(handle.content_type.as_deref(), Some("text/plain"));
        assert_eq!(std::fs::read_to_string(&handle.path).unwrap(), "some text here");

        assert!(matches!(events[2], PartEvent::Close));
    }

    #[tokio::test]
    async fn test_file_over_limit_is_removed() {
        let dir = TempDir::new().unwrap();
        let body = [file_part("text", "foo.txt", &"x".repeat(600)), closing()].concat();
        let inbound = InboundBody::new(Body::from(body));
        let mut source = MulterSource::start(
            &content_type(),
            &inbound,
            UploadLimits {
                max_files_size: 512,
                ..limits(&dir)
            },
        );

        let events = collect(&mut source).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            PartEvent::Error(TokenizerError::LimitExceeded {
                limit: Limit::FilesSize,
                max: 512
            })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_too_many_fields() {
        let dir = TempDir::new().unwrap();
        let body = [field_part("a", "1"), field_part("b", "2"), closing()].concat();
        let inbound = InboundBody::new(Body::from(body));
        let mut source = MulterSource::start(
            &content_type(),
            &inbound,
            UploadLimits {
                max_fields: 1,
                ..limits(&dir)
            },
        );

        let events = collect(&mut source).await;
        assert!(matches!(events[0], PartEvent::Field { .. }));
        assert!(matches!(
            events[1],
            PartEvent::Error(TokenizerError::LimitExceeded {
                limit: Limit::FieldCount,
                ..
            })
        ));
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_truncated_body_is_malformed() {
        let dir = TempDir::new().unwrap();
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue without end"
        );
        let inbound = InboundBody::new(Body::from(body));
        let mut source = MulterSource::start(&content_type(), &inbound, limits(&dir));

        let events = collect(&mut source).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            PartEvent::Error(TokenizerError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_boundary_fails_first() {
        let dir = TempDir::new().unwrap();
        let inbound = InboundBody::new(Body::from("irrelevant"));
        let mut source = MulterSource::start("multipart/form-data", &inbound, limits(&dir));

        let events = collect(&mut source).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PartEvent::Error(_)));
        assert!(inbound.is_readable().await);
    }
}
