//! Errors raised while producing observations (page fetch and extraction).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP error status code
    #[error("HTTP error {status} for {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Failed to parse an embedded JSON blob
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading or writing a fixture page failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The page did not have the structure the vendor layout expects
    #[error("Extraction failed for {product}: {reason}")]
    Extraction { product: String, reason: String },

    /// A concurrent fetch task panicked or was cancelled
    #[error("Fetch task failed: {0}")]
    Task(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_error_names_product() {
        let err = FetchError::Extraction {
            product: "Rogue Fleck Plates".to_string(),
            reason: "missing swatch data".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Extraction failed for Rogue Fleck Plates: missing swatch data"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FetchError = io.into();
        assert!(matches!(err, FetchError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
