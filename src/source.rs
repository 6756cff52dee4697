use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Written in place of a search result when the dictionary has no verb entry.
pub const NOT_FOUND_MARKER: &str = "NOT_FOUND_SKIPPED";

/// Raw conjugation page of one verb.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub infinitive: String,
    /// Dictionary entry id; names the page's root element when known.
    pub entry_id: Option<String>,
    pub html: String,
}

pub trait PageSource {
    fn fetch_raw_page(&self, infinitive: &str) -> Result<RawPage, FetchError>;
}

/// Search result for one verb as stored next to its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedEntry {
    Found { entry_id: String, nature: String },
    NotFound,
}

/// On-disk cache: `<verb>.html` holds the page, `<verb>.txt` the search result
/// (`entry_id\tnature`, or the not-found marker).
#[derive(Debug, Clone)]
pub struct CacheSource {
    dir: PathBuf,
}

impl CacheSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn html_path(&self, infinitive: &str) -> PathBuf {
        self.dir.join(format!("{}.html", infinitive))
    }

    fn entry_path(&self, infinitive: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", infinitive))
    }

    pub fn has_page(&self, infinitive: &str) -> bool {
        self.html_path(infinitive).exists()
    }

    pub fn read_entry(&self, infinitive: &str) -> io::Result<Option<CachedEntry>> {
        let text = match fs::read_to_string(self.entry_path(infinitive)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let line = text.trim();
        if line == NOT_FOUND_MARKER {
            return Ok(Some(CachedEntry::NotFound));
        }
        let (entry_id, nature) = line.split_once('\t').unwrap_or((line, ""));
        Ok(Some(CachedEntry::Found {
            entry_id: entry_id.to_string(),
            nature: nature.to_string(),
        }))
    }

    pub fn write_entry(&self, infinitive: &str, entry: &CachedEntry) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let line = match entry {
            CachedEntry::Found { entry_id, nature } => format!("{}\t{}", entry_id, nature),
            CachedEntry::NotFound => NOT_FOUND_MARKER.to_string(),
        };
        fs::write(self.entry_path(infinitive), line)
    }

    pub fn write_page(&self, infinitive: &str, html: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.html_path(infinitive), html)
    }
}

impl PageSource for CacheSource {
    fn fetch_raw_page(&self, infinitive: &str) -> Result<RawPage, FetchError> {
        let entry_id = match self.read_entry(infinitive)? {
            Some(CachedEntry::NotFound) => return Err(FetchError::NotFound(infinitive.to_string())),
            Some(CachedEntry::Found { entry_id, .. }) => Some(entry_id),
            None => None,
        };
        let html = fs::read_to_string(self.html_path(infinitive))?;
        Ok(RawPage {
            infinitive: infinitive.to_string(),
            entry_id,
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_page_with_entry_id() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheSource::new(dir.path());
        cache
            .write_entry(
                "aller",
                &CachedEntry::Found {
                    entry_id: "A9A1234".into(),
                    nature: "v. intr.".into(),
                },
            )
            .unwrap();
        cache.write_page("aller", "<div id=\"A9A1234\"></div>").unwrap();

        let page = cache.fetch_raw_page("aller").unwrap();
        assert_eq!(page.entry_id.as_deref(), Some("A9A1234"));
        assert!(page.html.contains("A9A1234"));
        assert!(cache.has_page("aller"));
    }

    #[test]
    fn not_found_marker() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheSource::new(dir.path());
        cache.write_entry("zzz", &CachedEntry::NotFound).unwrap();
        assert_eq!(cache.read_entry("zzz").unwrap(), Some(CachedEntry::NotFound));
        assert!(matches!(cache.fetch_raw_page("zzz"), Err(FetchError::NotFound(v)) if v == "zzz"));
    }

    #[test]
    fn missing_page_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheSource::new(dir.path());
        assert_eq!(cache.read_entry("aller").unwrap(), None);
        assert!(matches!(cache.fetch_raw_page("aller"), Err(FetchError::Io(_))));
    }
}
