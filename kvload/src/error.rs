/// Errors that can happen while setting up a load run.
///
/// Failures of individual requests are not errors in this sense. They are counted by the run
/// harness and reported in the [`Summary`](crate::Summary).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration sources could not be read or extracted.
    #[error("failed to load configuration: {0}")]
    Config(#[from] Box<figment::Error>),
    /// The configuration was read, but a value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The base URL or a request URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Any error emitted from the underlying [`reqwest`] client.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
