//! Per-book reading positions kept between sessions.
//!
//! Positions are stored as [`ByteAddress`]es, which survive reflows; the page
//! is only a hint for shells that want to show something before relayout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::address::ByteAddress;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub address: ByteAddress,
    #[serde(default)]
    pub page: usize,
    pub last_read: DateTime<Utc>,
}

/// Reading positions keyed by book. Backed by a JSON file unless built with
/// [`ProgressStore::in_memory`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProgressStore {
    books: HashMap<String, ReadingProgress>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl ProgressStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`. A missing file is an empty store that will
    /// be created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = if path.exists() {
            serde_json::from_str::<Self>(&fs::read_to_string(&path)?)?
        } else {
            Self::default()
        };
        log::debug!("Opened {} reading positions from {path:?}", store.books.len());
        store.path = Some(path);
        Ok(store)
    }

    /// Like [`ProgressStore::open`], but an unreadable file starts over empty
    /// (and is replaced on the next write).
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::open(&path).unwrap_or_else(|e| {
            log::error!("Failed to read reading positions from {path:?}: {e}");
            Self {
                books: HashMap::new(),
                path: Some(path),
            }
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn position(&self, book: &str) -> Option<&ReadingProgress> {
        self.books.get(book)
    }

    /// The book read last, if any.
    pub fn most_recent(&self) -> Option<(&str, &ReadingProgress)> {
        self.books
            .iter()
            .max_by_key(|(_, progress)| progress.last_read)
            .map(|(book, progress)| (book.as_str(), progress))
    }

    /// Books ordered from most to least recently read.
    pub fn recent_books(&self) -> Vec<(&str, &ReadingProgress)> {
        let mut books: Vec<_> = self
            .books
            .iter()
            .map(|(book, progress)| (book.as_str(), progress))
            .collect();
        books.sort_by(|a, b| b.1.last_read.cmp(&a.1.last_read));
        books
    }

    /// Stores the position for `book` and writes the file.
    ///
    /// Returns `false` without touching anything when the book is already at
    /// `address`: page turns that don't cross a text run don't rewrite the
    /// file.
    pub fn record(&mut self, book: &str, address: ByteAddress, page: usize) -> Result<bool> {
        if self
            .books
            .get(book)
            .is_some_and(|saved| saved.address == address)
        {
            log::trace!("{book} still at {address}, nothing to record");
            return Ok(false);
        }

        self.books.insert(
            book.to_string(),
            ReadingProgress {
                address,
                page,
                last_read: Utc::now(),
            },
        );
        self.persist()?;
        Ok(true)
    }

    /// Drops the position for `book`. Returns whether there was one.
    pub fn forget(&mut self, book: &str) -> Result<bool> {
        if self.books.remove(book).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Writes next to the target and renames over it, so a crash mid-write
    /// leaves the previous file intact.
    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string_pretty(self)?)?;
        fs::rename(&staging, path)?;
        log::debug!("Saved {} reading positions to {path:?}", self.books.len());
        Ok(())
    }
}
