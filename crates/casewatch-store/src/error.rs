use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state directory has no parent: {0}")]
    NoParent(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
