use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use thiserror::Error;

pub const NOTE_EXTENSION: &str = ".md";
pub const MODIFIED_FMT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed reading notes directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed inspecting {path}: {source}")]
    Stat {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed opening {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed creating {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed deleting {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Truncate,
    Seek,
    Write,
    Close,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaveStage::Truncate => "Truncate",
            SaveStage::Seek => "Seek",
            SaveStage::Write => "Write",
            SaveStage::Close => "Close",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
#[error("{stage} error on {path}: {source}")]
pub struct SaveError {
    pub stage: SaveStage,
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// One entry of the notes directory. The title is the file name without
/// its `.md` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub title: String,
    pub modified: DateTime<Local>,
}

impl Note {
    pub fn description(&self) -> String {
        self.modified.format(MODIFIED_FMT).to_string()
    }
}

/// Line ending a note was loaded with. The buffer always holds `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EolStyle {
    #[default]
    Lf,
    Crlf,
}

pub fn detect_eol(content: &str) -> EolStyle {
    if content.contains("\r\n") {
        EolStyle::Crlf
    } else {
        EolStyle::Lf
    }
}

/// Open read/write handle on a note file. Dropping it closes the file.
#[derive(Debug)]
pub struct NoteFile {
    file: File,
    path: PathBuf,
    eol: EolStyle,
}

impl NoteFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the whole file with `content`, restoring the line ending the
    /// note was loaded with. The handle stays usable.
    pub fn write_contents(&mut self, content: &str) -> Result<(), SaveError> {
        let out = match self.eol {
            EolStyle::Lf => Cow::Borrowed(content),
            EolStyle::Crlf => Cow::Owned(content.replace('\n', "\r\n")),
        };
        let path = self.path.display().to_string();
        let fail = |stage: SaveStage, source: std::io::Error| SaveError {
            stage,
            path: path.clone(),
            source,
        };
        self.file
            .set_len(0)
            .map_err(|e| fail(SaveStage::Truncate, e))?;
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| fail(SaveStage::Seek, e))?;
        self.file
            .write_all(out.as_bytes())
            .map_err(|e| fail(SaveStage::Write, e))?;
        self.file
            .sync_all()
            .map_err(|e| fail(SaveStage::Close, e))?;
        Ok(())
    }
}

/// Flat directory of `<title>.md` files. The filesystem is the only index.
#[derive(Debug, Clone)]
pub struct NoteStore {
    dir: PathBuf,
}

impl NoteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn note_path(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{title}{NOTE_EXTENSION}"))
    }

    pub fn list(&self) -> Result<Vec<Note>, IoError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| IoError::ReadDir {
            path: self.dir.display().to_string(),
            source,
        })?;

        let mut notes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| IoError::ReadDir {
                path: self.dir.display().to_string(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(title) = name.strip_suffix(NOTE_EXTENSION) else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            let metadata = entry.metadata().map_err(|source| IoError::Stat {
                path: entry.path().display().to_string(),
                source,
            })?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            notes.push(Note {
                title: title.to_string(),
                modified: DateTime::<Local>::from(modified),
            });
        }
        notes.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(notes)
    }

    pub fn open_or_create(&self, path: &Path) -> Result<(NoteFile, String), IoError> {
        let mut file = match fs::metadata(path) {
            Ok(_) => OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|source| IoError::Open {
                    path: path.display().to_string(),
                    source,
                })?,
            Err(e) if e.kind() == ErrorKind::NotFound => OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(path)
                .map_err(|source| IoError::Create {
                    path: path.display().to_string(),
                    source,
                })?,
            Err(source) => {
                return Err(IoError::Stat {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .map_err(|source| IoError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let raw = String::from_utf8_lossy(&bytes);
        let eol = detect_eol(&raw);
        let content = raw.replace("\r\n", "\n");
        tracing::debug!(path = %path.display(), bytes = bytes.len(), ?eol, "opened note");

        Ok((
            NoteFile {
                file,
                path: path.to_path_buf(),
                eol,
            },
            content,
        ))
    }

    /// Writes `content` and closes the handle.
    pub fn save(&self, mut handle: NoteFile, content: &str) -> Result<(), SaveError> {
        handle.write_contents(content)?;
        tracing::debug!(path = %handle.path.display(), "saved and closed note");
        Ok(())
    }

    pub fn delete(&self, path: &Path) -> Result<(), IoError> {
        fs::remove_file(path).map_err(|source| IoError::Delete {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), "deleted note");
        Ok(())
    }
}

#[cfg(test)]
impl NoteFile {
    /// Handle whose writes always fail, for exercising save errors.
    pub(crate) fn read_only(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            file: File::open(path)?,
            path: path.to_path_buf(),
            eol: EolStyle::Lf,
        })
    }
}
