mod notes;

pub use notes::{IoError, Note, NoteFile, NoteStore, SaveError};
