use std::fmt;

#[derive(Debug)]
pub enum Error {
    Configuration(String),
    UnsupportedValue { kind: &'static str, value: String },
    OutOfRange { value: f64, min: f64, max: f64 },
    Parse(String),
    Json(serde_json::Error),
    Http(reqwest::Error),
    ChannelClosed,
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Error::UnsupportedValue { kind, value } => write!(f, "unsupported {kind}: {value}"),
            Error::OutOfRange { value, min, max } => {
                write!(f, "temperature {value} out of range {min}..={max}")
            }
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::ChannelClosed => write!(f, "publish channel closed"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(e) => Some(e),
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
