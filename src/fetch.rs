//! Icon retrieval by slug.
//!
//! Icons are served as static assets under `/icons/{slug}.svg`. The fetcher
//! returns the raw markup text unchanged; callers that download the SVG
//! format deliver exactly these bytes.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    /// The slug is empty or contains characters that are not valid in an
    /// icon identifier. Rejected before any network I/O.
    #[error("invalid icon slug: {0:?}")]
    InvalidSlug(String),

    /// The request failed or returned a non-success status. Propagated
    /// as-is; there is no retry.
    #[error("failed to fetch icon: {0}")]
    Http(#[from] Box<ureq::Error>),
}

/// Retrieves icon SVG markup from the asset server.
///
/// Each fetcher owns a connection agent with a global timeout so a stalled
/// server bounds the whole request instead of hanging the export job.
///
/// # Example
///
/// ```no_run
/// use icondeck_exporter::IconFetcher;
/// use std::time::Duration;
///
/// let fetcher = IconFetcher::new("https://icons.example.org", Duration::from_secs(30));
/// let svg = fetcher.fetch_svg("simpleicons")?;
/// assert!(svg.contains("<svg"));
/// # Ok::<(), icondeck_exporter::FetchError>(())
/// ```
pub struct IconFetcher {
    agent: ureq::Agent,
    base_url: String,
}

impl IconFetcher {
    /// Creates a fetcher for the given asset server base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the asset URL for a slug: `{base_url}/icons/{slug}.svg`.
    pub fn icon_url(&self, slug: &str) -> String {
        format!("{}/icons/{}.svg", self.base_url, slug)
    }

    /// Fetches the raw SVG markup for a slug.
    ///
    /// The returned text is byte-identical to the served asset. Network
    /// failures and non-success statuses are propagated to the caller.
    pub fn fetch_svg(&self, slug: &str) -> Result<String, FetchError> {
        validate_slug(slug)?;

        let url = self.icon_url(slug);
        log::debug!("fetching {url}");

        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| FetchError::Http(Box::new(e)))?;
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(text)
    }
}

/// Slugs double as fetch path segments and download filenames, so anything
/// that could escape either context is rejected up front.
fn validate_slug(slug: &str) -> Result<(), FetchError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !slug.contains("..");

    if valid {
        Ok(())
    } else {
        Err(FetchError::InvalidSlug(slug.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves a single canned HTTP response on a loopback port and returns
    /// the base URL to reach it.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: image/svg+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            )
            .unwrap();
        });

        format!("http://{addr}")
    }

    const SVG: &str =
        r#"<svg role="img" viewBox="0 0 24 24" xmlns="http://www.w3.org/2000/svg"><path d="M12 0L24 24H0Z"/></svg>"#;

    #[test]
    fn fetch_returns_served_markup_verbatim() {
        let base = serve_once("200 OK", SVG);
        let fetcher = IconFetcher::new(base, Duration::from_secs(5));

        let text = fetcher.fetch_svg("triangle").unwrap();
        assert_eq!(text, SVG);
    }

    #[test]
    fn non_success_status_is_an_error() {
        let base = serve_once("404 Not Found", "");
        let fetcher = IconFetcher::new(base, Duration::from_secs(5));

        let err = fetcher.fetch_svg("missing").unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }

    #[test]
    fn icon_url_layout() {
        let fetcher = IconFetcher::new("https://icons.example.org/", Duration::from_secs(5));
        assert_eq!(
            fetcher.icon_url("rust"),
            "https://icons.example.org/icons/rust.svg"
        );
    }

    #[test]
    fn invalid_slugs_are_rejected_before_io() {
        // Base URL points nowhere; validation must fail first.
        let fetcher = IconFetcher::new("http://127.0.0.1:1", Duration::from_secs(5));

        for slug in ["", "a/b", "..", "a b", "c\\d"] {
            let err = fetcher.fetch_svg(slug).unwrap_err();
            assert!(matches!(err, FetchError::InvalidSlug(_)), "slug {slug:?}");
        }
    }

    #[test]
    fn dots_and_dashes_are_valid_slug_characters() {
        assert!(validate_slug("dot-net").is_ok());
        assert!(validate_slug("web3.js").is_ok());
        assert!(validate_slug("under_score").is_ok());
    }
}
