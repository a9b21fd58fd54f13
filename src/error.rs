use std::path::PathBuf;

/// Failures while loading or navigating the external design model.
#[derive(Debug, thiserror::Error)]
pub enum DesignError {
    #[error("failed to read design {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("design is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("design archive is unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("design archive has no `{0}` entry")]
    MissingArchiveEntry(String),
    #[error("no block at hierarchical path `{0}`")]
    UnknownPath(String),
}

/// Structural preconditions violated while building a diagram.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("port `{port}` belongs to block `{owner}`, which is outside the scope of `{scope}`")]
    PortOutOfScope {
        port: String,
        owner: String,
        scope: String,
    },
}
