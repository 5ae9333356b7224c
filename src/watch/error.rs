use thiserror::Error;

/// Failures that abort a whole in-process scan.
///
/// Unknown word owners and per-message query failures are not errors: they
/// are skipped and the pass continues.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to load watch words: {0:#}")]
    CatalogLoad(anyhow::Error),

    #[error("failed to load user directory: {0:#}")]
    UserDirectoryLoad(anyhow::Error),
}
