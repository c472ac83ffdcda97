//! Flat-file record store for user records.
//!
//! The whole collection lives in one CSV file with the fixed header
//! `id,name,email,password`. Every read parses the entire file and every write
//! replaces it. Fields are never quoted, so a comma inside a name or email makes
//! the file unreadable until it is fixed by hand.
//!
//! There is no locking: two concurrent read-modify-write cycles race and the
//! last `save_all` wins.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::users::repo_types::UserRecord;

pub const HEADER: [&str; 4] = ["id", "name", "email", "password"];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user store io error: {0}")]
    Io(#[from] io::Error),

    /// The backing file does not have the expected columnar layout.
    #[error("user store is corrupt at line {line}: {reason}")]
    Corrupt { line: u64, reason: String },

    #[error("could not serialize user records: {0}")]
    Serialize(String),

    /// The highest stored id leaves no room for another record.
    #[error("no user ids left after {0}")]
    IdsExhausted(u64),
}

#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the backing file with only a header row if it does not exist yet.
    pub async fn init(&self) -> Result<(), StoreError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        self.save_all(&[]).await?;
        info!(path = %self.path.display(), "created empty user store");
        Ok(())
    }

    pub async fn load_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.init().await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let records = parse_records(&bytes)?;
        debug!(count = records.len(), "user store loaded");
        Ok(records)
    }

    /// Replaces the backing file with `records`.
    ///
    /// The new content goes to a uniquely named temp file in the same directory
    /// which is then renamed over the target, so a concurrent reader sees either
    /// the old file or the new one, and concurrent writers never share a temp
    /// file.
    pub async fn save_all(&self, records: &[UserRecord]) -> Result<(), StoreError> {
        let bytes = render_records(records)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &bytes))
            .await
            .map_err(|e| StoreError::Io(io::Error::new(io::ErrorKind::Other, e)))??;
        debug!(count = records.len(), "user store saved");
        Ok(())
    }
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    // Dropping the temp file on error removes it.
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn corrupt(err: csv::Error) -> StoreError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    StoreError::Corrupt {
        line,
        reason: err.to_string(),
    }
}

pub(crate) fn parse_records(bytes: &[u8]) -> Result<Vec<UserRecord>, StoreError> {
    // A zero-length file (e.g. truncated by hand) reads as an empty collection.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .quoting(false)
        .from_reader(bytes);

    let headers = reader.headers().map_err(corrupt)?;
    if headers.iter().ne(HEADER) {
        return Err(StoreError::Corrupt {
            line: 1,
            reason: format!("expected header {:?}, found {:?}", HEADER.join(","), headers),
        });
    }

    reader
        .deserialize::<UserRecord>()
        .map(|row| row.map_err(corrupt))
        .collect()
}

pub(crate) fn render_records(records: &[UserRecord]) -> Result<Vec<u8>, StoreError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(HEADER)
        .map_err(|e| StoreError::Serialize(e.to_string()))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| StoreError::Serialize(e.to_string()))
}
