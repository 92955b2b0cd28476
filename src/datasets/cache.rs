//! Download-once, read-from-disk-afterwards CSV cache.
//!
//! The cached file is the remote CSV with its preamble removed, so reading it
//! back never needs to know how many lines the source skips.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;

use crate::datasets::raw::RawTable;
use crate::error::AppError;

/// Where a dataset lives and how many preamble lines precede its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvSource {
    pub url: &'static str,
    pub skip_rows: usize,
}

/// Anything that can turn a URL into text.
///
/// The HTTP implementation is used in the binary; tests plug in canned bodies.
pub trait Fetch {
    fn fetch_text(&self, url: &str) -> Result<String, AppError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("data-dives/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, AppError> {
        log::info!("downloading {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::runtime(format!("Request to {url} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::runtime(format!(
                "Request to {url} failed with status {}.",
                resp.status()
            )));
        }

        resp.text()
            .map_err(|e| AppError::runtime(format!("Failed to read response from {url}: {e}")))
    }
}

/// Extract a file name from a URL's path (query and fragment ignored).
pub fn file_name_from_url(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => without_query,
    };
    let name = path.rsplit('/').next().unwrap_or("");
    (!name.is_empty()).then(|| name.to_string())
}

/// Path of the cached copy of `url` under `data_dir`.
pub fn cache_path(data_dir: &Path, url: &str) -> Result<PathBuf, AppError> {
    let name = file_name_from_url(url)
        .ok_or_else(|| AppError::usage(format!("Cannot derive a file name from URL '{url}'.")))?;
    Ok(data_dir.join(name))
}

/// Load `source` from `path` if cached, else fetch it, strip the preamble, and cache it.
pub fn load_csv_data(
    path: &Path,
    source: &CsvSource,
    force: bool,
    fetch: &dyn Fetch,
) -> Result<RawTable, AppError> {
    if path.exists() && !force {
        log::info!("reading cached {}", path.display());
        return RawTable::from_path(path);
    }

    let body = fetch.fetch_text(source.url)?;
    let csv_text = skip_lines(&body, source.skip_rows);
    let table = RawTable::from_csv_str(csv_text)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::usage(format!("Failed to create data dir '{}': {e}", parent.display()))
        })?;
    }
    std::fs::write(path, csv_text)
        .map_err(|e| AppError::usage(format!("Failed to cache '{}': {e}", path.display())))?;
    log::info!("cached {} rows to {}", table.len(), path.display());

    Ok(table)
}

fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    /// Serves one canned body and counts requests.
    pub(crate) struct CannedFetch {
        pub body: String,
        pub calls: Cell<usize>,
    }

    impl CannedFetch {
        pub fn new(body: impl Into<String>) -> Self {
            Self {
                body: body.into(),
                calls: Cell::new(0),
            }
        }
    }

    impl Fetch for CannedFetch {
        fn fetch_text(&self, _url: &str) -> Result<String, AppError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.body.clone())
        }
    }

    #[test]
    fn file_names_from_urls() {
        assert_eq!(
            file_name_from_url("https://data.giss.nasa.gov/gistemp/tabledata_v4/GLB.Ts+dSST.csv").as_deref(),
            Some("GLB.Ts+dSST.csv")
        );
        assert_eq!(
            file_name_from_url("https://example.org/a/b.csv?x=1#frag").as_deref(),
            Some("b.csv")
        );
        assert_eq!(file_name_from_url("https://example.org/"), None);
        assert_eq!(file_name_from_url("https://example.org"), None);
    }

    #[test]
    fn fetches_once_then_reads_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.csv");
        let source = CsvSource {
            url: "https://example.org/x.csv",
            skip_rows: 2,
        };
        let fetch = CannedFetch::new("# preamble\n# more\na,b\n1,2\n");

        let first = load_csv_data(&path, &source, false, &fetch).unwrap();
        assert_eq!(first.headers, vec!["a", "b"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");

        let second = load_csv_data(&path, &source, false, &fetch).unwrap();
        assert_eq!(second, first);
        assert_eq!(fetch.calls.get(), 1);

        load_csv_data(&path, &source, true, &fetch).unwrap();
        assert_eq!(fetch.calls.get(), 2);
    }

    #[test]
    fn skip_lines_past_end() {
        assert_eq!(skip_lines("a\nb\n", 1), "b\n");
        assert_eq!(skip_lines("a", 3), "");
    }
}
