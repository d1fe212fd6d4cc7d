use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use jobnotes_harvest::{PostingId, PostingRecord, RecordSink};

use crate::filename::{note_file_name, posting_id_from_file_name, sanitize};
use crate::format::render_note;
use crate::index::{IndexEntry, SidecarIndex, INDEX_FILE_NAME};

/// Notes filed under one sub directory per keyword.
#[derive(Debug)]
pub struct NoteStore {
    root: PathBuf,
    index: SidecarIndex,
}

impl NoteStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let index_path = root.join(INDEX_FILE_NAME);
        let index = match SidecarIndex::load(&index_path) {
            Ok(index) => index,
            Err(e) => {
                log::error!("Couldn't read note index {}: {e:#}", index_path.display());
                SidecarIndex::empty(index_path)
            }
        };
        Self { root, index }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &SidecarIndex {
        &self.index
    }

    /// Ids of every posting already stored.
    ///
    /// Combines the sidecar index with ids recovered from note file names,
    /// which covers notes written before the index existed. Never fails, an
    /// unreadable store yields what could be read.
    pub fn seed_ids(&self) -> HashSet<PostingId> {
        if !self.root.is_dir() {
            log::warn!(
                "Output directory {} doesn't exist, no posting is known yet",
                self.root.display()
            );
            return HashSet::new();
        }

        let mut ids: HashSet<PostingId> = self.index.ids().cloned().collect();
        let from_index = ids.len();

        let pattern = format!(
            "{}/*/*.md",
            glob::Pattern::escape(&self.root.to_string_lossy())
        );
        match glob::glob(&pattern) {
            Ok(paths) => {
                for entry in paths {
                    match entry {
                        Ok(path) => {
                            if let Some(id) = path
                                .file_name()
                                .and_then(|name| name.to_str())
                                .and_then(posting_id_from_file_name)
                            {
                                ids.insert(id);
                            }
                        }
                        Err(e) => log::warn!("Skipping unreadable note path: {e}"),
                    }
                }
            }
            Err(e) => log::error!("Couldn't scan notes in {}: {e}", self.root.display()),
        }

        log::info!(
            "Found {} stored postings ({from_index} indexed) in {}",
            ids.len(),
            self.root.display()
        );
        ids
    }

    /// Writes the note of `record` under `keyword` and indexes it.
    pub fn save(&mut self, keyword: &str, record: &PostingRecord) -> anyhow::Result<PathBuf> {
        let relative = Path::new(&sanitize(keyword)).join(note_file_name(record));
        let path = self.root.join(&relative);
        let content = render_note(record, Local::now())?;

        let dir = path.parent().unwrap_or(&self.root);
        fs_err::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        log::info!("Saved note {}", path.display());

        self.index.insert(
            record.id.clone(),
            IndexEntry {
                keyword: keyword.to_string(),
                path: relative,
            },
        );
        if let Err(e) = self.index.save() {
            log::error!("Couldn't update note index {}: {e:#}", self.index.path().display());
        }

        Ok(path)
    }
}

impl RecordSink for NoteStore {
    fn accept(&mut self, keyword: &str, record: &PostingRecord) -> anyhow::Result<()> {
        self.save(keyword, record).map(|_| ())
    }
}
