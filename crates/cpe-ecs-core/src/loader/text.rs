// Line-oriented record sources (files and in-memory readers).

use std::io::BufRead;
use tracing::debug;

use super::SourceLoader;
use crate::entry::parse_entry;
use crate::error::{Error, Result};

/// Comment markers, stripped in this order
const COMMENT_MARKERS: [&str; 2] = ["#", " //"];

/// Whether `line` belongs to records tagged `tag`
///
/// Compares the first `tag.len()` bytes of `line`, trimmed, against `tag`.
/// The comparison is case-sensitive. A line shorter than the tag never
/// matches.
pub fn tag_matches(line: &str, tag: &str) -> bool {
    line.get(..tag.len())
        .is_some_and(|prefix| prefix.trim() == tag)
}

/// Remove `#` and ` //` comments and surrounding whitespace
pub fn strip_comments(line: &str) -> &str {
    let mut record = line;
    for marker in COMMENT_MARKERS {
        if let Some((head, _)) = record.split_once(marker) {
            record = head;
        }
    }
    record.trim()
}

impl SourceLoader {
    /// Load records line by line from `reader`
    ///
    /// `origin` names the source in errors. A malformed record aborts the
    /// load with an error carrying its 1-based line number. Lines are
    /// decoded lossily, so invalid UTF-8 only fails the record it is in.
    pub fn load_from_reader<R: BufRead>(
        &self,
        reader: R,
        tag: Option<&str>,
        origin: &str,
    ) -> Result<usize> {
        let tag = tag.filter(|t| !t.is_empty());
        let mut count = 0;

        for (index, line) in reader.split(b'\n').enumerate() {
            let line = line.map_err(|e| Error::source(origin, e))?;
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            if let Some(tag) = tag
                && !tag_matches(line, tag)
            {
                continue;
            }

            let record = strip_comments(line);
            if record.is_empty() {
                continue;
            }

            let parsed = parse_entry(record).map_err(|e| e.in_line(origin, index + 1))?;
            if let Some(entry) = parsed {
                self.store.store(entry.cpe_address, entry);
                count += 1;
            }
        }

        debug!("Read {} entries from {}", count, origin);
        Ok(count)
    }
}
