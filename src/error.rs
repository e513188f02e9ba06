use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("State directory error: {0}")]
    Store(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
