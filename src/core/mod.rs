mod buffer;
mod commands;
mod widgets;

pub use buffer::{TextBuffer, cell_width};
pub use commands::Command;
pub use widgets::{LineInput, NoteList, Selectable, TextField};
