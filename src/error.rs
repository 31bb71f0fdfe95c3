#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl Error {
    pub(crate) fn persistence<S: Into<String>>(msg: S) -> Self {
        Error::Persistence(msg.into())
    }

    #[allow(dead_code)]
    pub(crate) fn sensor_unavailable<S: Into<String>>(msg: S) -> Self {
        Error::SensorUnavailable(msg.into())
    }

    pub(crate) fn invalid_data<S: Into<String>>(msg: S) -> Self {
        Error::InvalidData(msg.into())
    }

    pub(crate) fn service_unavailable<S: Into<String>>(msg: S) -> Self {
        Error::ServiceUnavailable(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
