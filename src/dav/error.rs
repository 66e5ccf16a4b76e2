use thiserror::Error;

#[derive(Error, Debug)]
pub enum DavError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{method} {url} returned status {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
    },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid request method: {0}")]
    InvalidMethod(String),

    #[error("Malformed multistatus response: {0}")]
    MalformedResponse(String),

    #[error("Multistatus response for {0} contained no resource")]
    EmptyMultistatus(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DavError {
    /// Map a reqwest failure, keeping timeouts distinguishable
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            DavError::Timeout(url.to_string())
        } else {
            DavError::Request(err.to_string())
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DavError::NotFound(_))
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            DavError::NotFound(_) => Some(404),
            DavError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(err: quick_xml::Error) -> Self {
        DavError::MalformedResponse(err.to_string())
    }
}

pub type DavResult<T> = Result<T, DavError>;
