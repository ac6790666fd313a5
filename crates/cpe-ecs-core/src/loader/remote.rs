// Remote (`url:`) record sources.
//
// The list is fetched with a bearer token appended as the `token` query
// parameter. Only a 200 response is processed; anything else leaves the
// table untouched. Errors name the URL without the token.

use tracing::{info, warn};

use super::SourceLoader;
use super::text::{strip_comments, tag_matches};
use crate::entry::parse_entry;
use crate::error::{Error, Result};
use crate::token::append_token;

/// Remote records shorter than this many bytes are skipped unparsed
pub const MIN_REMOTE_RECORD_LEN: usize = 19;

impl SourceLoader {
    /// Fetch `url` and load its records
    pub async fn load_from_url(&self, url: &str) -> Result<usize> {
        let fetcher = self
            .fetcher
            .as_ref()
            .ok_or_else(|| Error::source(url, "no remote fetcher configured"))?;

        let target = match &self.issuer {
            Some(issuer) => append_token(url, &issuer.issue()?),
            None => {
                warn!("No token secret configured, fetching {} unauthenticated", url);
                url.to_string()
            }
        };

        let response = fetcher.fetch(&target).await.map_err(|e| match e {
            Error::Source { message, .. } => Error::source(url, message),
            other => other,
        })?;

        if response.status != 200 {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let count = self.load_from_body(&response.body, url)?;
        info!("Loaded {} entries from {}", count, url);
        Ok(count)
    }

    /// Load the records of a fetched list body
    fn load_from_body(&self, body: &str, url: &str) -> Result<usize> {
        let body = body.trim().replace("\r\n", "\n");
        let mut count = 0;

        for record in body.split('\n') {
            if let Some(tag) = self.url_tag.as_deref()
                && !tag_matches(record, tag)
            {
                continue;
            }
            if record.len() < MIN_REMOTE_RECORD_LEN {
                continue;
            }
            let line = strip_comments(record);
            if line.is_empty() {
                continue;
            }

            let parsed = parse_entry(line).map_err(|e| e.in_record(url, record))?;
            if let Some(entry) = parsed {
                self.store.store(entry.cpe_address, entry);
                count += 1;
            }
        }

        Ok(count)
    }
}
