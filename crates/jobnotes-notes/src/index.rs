use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use jobnotes_harvest::PostingId;

pub const INDEX_FILE_NAME: &str = ".jobnotes-index.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IndexRow {
    id: PostingId,
    keyword: String,
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub keyword: String,
    /// Relative to the store root
    pub path: PathBuf,
}

/// Sidecar `id -> note` index kept next to the notes.
#[derive(Debug, Default)]
pub struct SidecarIndex {
    path: PathBuf,
    entries: BTreeMap<PostingId, IndexEntry>,
}

impl SidecarIndex {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Reads the index, a missing file is an empty index.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let mut index = Self::empty(path);
        let mut rdr = match csv::Reader::from_path(&index.path) {
            Ok(rdr) => rdr,
            Err(e) if is_not_found(&e) => return Ok(index),
            Err(e) => return Err(e.into()),
        };
        for row in rdr.deserialize() {
            let IndexRow { id, keyword, path } = row?;
            index.entries.insert(id, IndexEntry { keyword, path });
        }
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &PostingId) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &PostingId> {
        self.entries.keys()
    }

    pub fn insert(&mut self, id: PostingId, entry: IndexEntry) {
        self.entries.insert(id, entry);
    }

    /// Rewrites the whole index through a temporary file renamed over the
    /// previous one.
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs_err::create_dir_all(dir)?;
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file());
            for (id, entry) in &self.entries {
                wtr.serialize(IndexRow {
                    id: id.clone(),
                    keyword: entry.keyword.clone(),
                    path: entry.path.clone(),
                })?;
            }
            wtr.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn is_not_found(e: &csv::Error) -> bool {
    matches!(e.kind(), csv::ErrorKind::Io(io) if io.kind() == io::ErrorKind::NotFound)
}
