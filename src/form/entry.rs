use serde::Serialize;
use std::path::PathBuf;

/// An uploaded file as recorded by the tokenizer.
///
/// The backing file belongs to whoever wrote it; this type only remembers
/// where it lives so a consumer (or the cleanup task) can find it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHandle {
    pub field_name: String,
    pub original_filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: Option<String>,
}

/// Value carried by one named part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Scalar(String),
    File(FileHandle),
}

impl From<String> for Entry {
    fn from(value: String) -> Self {
        Entry::Scalar(value)
    }
}

impl From<&str> for Entry {
    fn from(value: &str) -> Self {
        Entry::Scalar(value.to_string())
    }
}

impl From<FileHandle> for Entry {
    fn from(handle: FileHandle) -> Self {
        Entry::File(handle)
    }
}

/// All values recorded under one raw part name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatedValue {
    Single(Entry),
    /// Created on the first repeat; holds values in arrival order.
    Many(Vec<Entry>),
}

impl AggregatedValue {
    pub fn len(&self) -> usize {
        match self {
            AggregatedValue::Single(_) => 1,
            AggregatedValue::Many(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_entries(self) -> Vec<Entry> {
        match self {
            AggregatedValue::Single(entry) => vec![entry],
            AggregatedValue::Many(entries) => entries,
        }
    }
}
