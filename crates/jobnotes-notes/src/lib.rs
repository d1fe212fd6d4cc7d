mod filename;
mod format;
mod index;
mod store;

pub use filename::{note_file_name, posting_id_from_file_name, sanitize};
pub use format::render_note;
pub use index::{IndexEntry, SidecarIndex, INDEX_FILE_NAME};
pub use store::NoteStore;
