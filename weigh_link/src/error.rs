use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },
    #[error("enumerate serial ports: {0}")]
    Enumerate(serialport::Error),
    #[error("port is not open")]
    NotOpen,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
