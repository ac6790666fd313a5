//! Source loader
//!
//! Resolves entry descriptors into records and writes them into the
//! [`MappingStore`].
//!
//! ## Descriptors
//!
//! ```text
//! ext:/etc/cpe.list        every record of a local file
//! ext:/etc/cpe.list:gold   only records tagged "gold"
//! url:https://host/list    a remote list, filtered by the loader's url tag
//! gold 10.0.0.1 192.0.2.1  anything else is one inline record
//! ```
//!
//! ## Failure Semantics
//!
//! Loading fails fast: the first bad line or source aborts the operation
//! and the batch it belongs to. Entries stored before the failure stay in
//! the table; there is no rollback.

mod remote;
mod text;

pub use remote::MIN_REMOTE_RECORD_LEN;
pub use text::{strip_comments, tag_matches};

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::entry::parse_entry;
use crate::error::{Error, Result};
use crate::store::MappingStore;
use crate::token::TokenIssuer;
use crate::traits::RemoteFetcher;

/// Where an entry descriptor points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource<'a> {
    /// `ext:` local file, possibly `path:tag`
    File(&'a str),
    /// `url:` remote list
    Url(&'a str),
    /// Inline record
    Text(&'a str),
}

impl<'a> EntrySource<'a> {
    /// Classify a descriptor by its prefix
    pub fn parse(entry: &'a str) -> Self {
        if let Some(file) = entry.strip_prefix("ext:") {
            EntrySource::File(file)
        } else if let Some(url) = entry.strip_prefix("url:") {
            EntrySource::Url(url)
        } else {
            EntrySource::Text(entry)
        }
    }
}

/// Loads entry descriptors into a shared [`MappingStore`]
///
/// All load methods return the number of entries stored.
pub struct SourceLoader {
    store: Arc<MappingStore>,
    fetcher: Option<Arc<dyn RemoteFetcher>>,
    issuer: Option<TokenIssuer>,
    url_tag: Option<String>,
}

impl SourceLoader {
    /// Create a loader writing into `store`
    ///
    /// Without a fetcher, `url:` descriptors fail with a source error.
    pub fn new(store: Arc<MappingStore>) -> Self {
        Self {
            store,
            fetcher: None,
            issuer: None,
            url_tag: None,
        }
    }

    /// Use `fetcher` for `url:` descriptors
    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Authenticate `url:` fetches with tokens from `issuer`
    pub fn with_token_issuer(mut self, issuer: TokenIssuer) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Only import remote records tagged `tag`
    pub fn with_url_tag(mut self, tag: impl Into<String>) -> Self {
        self.url_tag = Some(tag.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// The store this loader writes into
    pub fn store(&self) -> &Arc<MappingStore> {
        &self.store
    }

    /// Load every descriptor in order, stopping at the first failure
    pub async fn batch_load<S>(&self, entries: &[S]) -> Result<usize>
    where
        S: AsRef<str> + Sync,
    {
        let mut total = 0;
        for entry in entries {
            let entry = entry.as_ref();
            total += self.load(entry).await.map_err(|e| e.in_entry(entry))?;
        }
        Ok(total)
    }

    /// Load every file descriptor in order, stopping at the first failure
    pub async fn batch_load_from_files<S>(&self, files: &[S]) -> Result<usize>
    where
        S: AsRef<str> + Sync,
    {
        let mut total = 0;
        for file in files {
            let file = file.as_ref();
            total += self.load_from_file(file).await.map_err(|e| e.in_file(file))?;
        }
        Ok(total)
    }

    /// Load one descriptor
    pub async fn load(&self, entry: &str) -> Result<usize> {
        match EntrySource::parse(entry) {
            EntrySource::File(file) => self.load_from_file(file).await,
            EntrySource::Url(url) => self.load_from_url(url).await,
            EntrySource::Text(record) => self.load_from_text(record),
        }
    }

    /// Load one inline record
    ///
    /// Records with fewer than three fields store nothing and succeed.
    pub fn load_from_text(&self, record: &str) -> Result<usize> {
        match parse_entry(record)? {
            Some(entry) => {
                debug!("Stored {} -> {}", entry.cpe_address, entry.ecs_address);
                self.store.store(entry.cpe_address, entry);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Load a file descriptor: `path` or `path:tag`
    pub async fn load_from_file(&self, file: &str) -> Result<usize> {
        match file.split_once(':') {
            Some((path, tag)) => self.load_from_text_file(path, Some(tag)).await,
            None => self.load_from_text_file(file, None).await,
        }
    }

    /// Load every record of `path`, keeping only those tagged `tag`
    pub async fn load_from_text_file(
        &self,
        path: impl AsRef<Path>,
        tag: Option<&str>,
    ) -> Result<usize> {
        let path = path.as_ref();
        let origin = path.display().to_string();

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::source(&origin, e))?;

        let count = self.load_from_reader(data.as_slice(), tag, &origin)?;
        info!("Loaded {} entries from {}", count, origin);
        Ok(count)
    }
}
