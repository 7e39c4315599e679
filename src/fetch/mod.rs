//! Loading raw record bytes from a local file or over HTTP.

use tracing::debug;

use crate::error::SourceError;

/// Downloads `url`, failing on a non-success status.
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, SourceError> {
    let url: reqwest::Url = url
        .parse()
        .map_err(|e| SourceError::Url(format!("{url}: {e}")))?;

    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Reads `source` from disk, or fetches it when it is an `http(s)` URL.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load_source(source: &str) -> Result<Vec<u8>, SourceError> {
    let bytes = if is_url(source) {
        fetch_bytes(&reqwest::Client::new(), source).await?
    } else {
        tokio::fs::read(source).await?
    };
    debug!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.org/tripinfo.csv"));
        assert!(is_url("http://localhost:8000/t.json"));
        assert!(!is_url("httpdata/tripinfo.csv"));
        assert!(!is_url("/tmp/tripinfo.csv"));
    }

    #[tokio::test]
    async fn test_load_source_reads_file() {
        let path = std::env::temp_dir().join("tripinfo_stats_test_source.csv");
        std::fs::write(&path, b"id\n").unwrap();

        let bytes = load_source(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"id\n");

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_load_source_missing_file() {
        let err = load_source("/nonexistent/tripinfo.csv").await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[tokio::test]
    async fn test_fetch_bytes_rejects_bad_url() {
        let err = fetch_bytes(&reqwest::Client::new(), "not a url").await.unwrap_err();
        assert!(matches!(err, SourceError::Url(_)));
    }
}
