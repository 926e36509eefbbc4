//! Read-only image catalog shared by every gallery component.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: ImageId,
    pub path: PathBuf,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub object_count: u32,
}

impl ImageRecord {
    /// Record with metadata derived from the path alone.
    pub fn from_path(id: ImageId, path: PathBuf) -> Self {
        let mut record = Self {
            id,
            path,
            title: String::new(),
            description: String::new(),
            details: String::new(),
            object_count: 0,
        };
        record.fill_derived_title();
        record
    }

    fn fill_derived_title(&mut self) {
        if self.title.is_empty() {
            self.title = self
                .path
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or_default()
                .to_string();
        }
    }
}

/// Ordered, immutable image collection. Insertion order is the navigation order.
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Arc<[ImageRecord]>,
}

impl Catalog {
    pub fn from_records(mut records: Vec<ImageRecord>) -> Result<Self, Error> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &mut records {
            if record.path.as_os_str().is_empty() {
                return Err(Error::EmptyPath(record.id));
            }
            if !seen.insert(record.id) {
                return Err(Error::DuplicateId(record.id));
            }
            record.fill_derived_title();
        }
        Ok(Self {
            records: records.into(),
        })
    }

    /// Parse a JSON array of records. Relative paths resolve against the file's directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut records: Vec<ImageRecord> = serde_json::from_str(&text)?;
        if let Some(base) = path.parent() {
            for record in &mut records {
                if record.path.is_relative() {
                    record.path = base.join(&record.path);
                }
            }
        }
        Self::from_records(records)
    }

    /// Recursively collect images below `dir`, sorted by path, with ids assigned from 1.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::BadPath(dir.to_path_buf()));
        }
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_image(p))
            .collect();
        if paths.is_empty() {
            return Err(Error::EmptyScan(dir.to_path_buf()));
        }
        paths.sort();
        debug!(count = paths.len(), root = %dir.display(), "catalog directory scan");
        let records = paths
            .into_iter()
            .zip(1u64..)
            .map(|(path, id)| ImageRecord::from_path(ImageId(id), path))
            .collect();
        Self::from_records(records)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_directory(path)
        } else if path.is_file() {
            Self::from_json_file(path)
        } else {
            Err(Error::BadPath(path.to_path_buf()))
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    pub fn index_of(&self, id: ImageId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn find(&self, id: ImageId) -> Option<&ImageRecord> {
        self.index_of(id).and_then(|idx| self.get(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn ids(&self) -> Vec<ImageId> {
        self.records.iter().map(|r| r.id).collect()
    }
}

#[inline]
fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if ["jpg", "jpeg", "png", "webp", "gif"].contains(&e.as_str())
    )
}
