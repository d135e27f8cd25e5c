use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Curation error: {0}")]
    Curator(#[from] core_curator::CuratorError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
