use std::path::PathBuf;

/// Failures that stop a whole file from being processed.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load PDF {}: {}", .path.display(), .source)]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("unsupported input type: {}", .0.display())]
    Unsupported(PathBuf),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
