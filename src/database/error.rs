use std::{
    convert::Infallible,
    fmt::{self, Display},
};

use serde::Serialize;
use warp::{
    http::StatusCode,
    reject::{self, Rejection},
    reply::{self, Reply},
};

/// Error returned by every action of the SDK. `code` is the HTTP status the
/// error should surface as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.info {
            Some(info) => write!(f, "{} ({info})", self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}
impl reject::Reject for Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HtmlError {
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Invalid session")]
    InvalidSession,
    #[error("You don't have permission to perform this action")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("Internal server error")]
    InternalServerError,
}

impl HtmlError {
    pub fn code(self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::InvalidSession => 401,
            HtmlError::Unauthorized => 403,
            HtmlError::NotFound => 404,
            HtmlError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_string()),
        }
    }

    pub fn default(self) -> Error {
        Error {
            code: self.code(),
            info: Some(self.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct QueryError {
    kind: HtmlError,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: HtmlError::InternalServerError,
            info,
        }
    }

    fn with_kind(kind: HtmlError, info: String) -> Self {
        Self { kind, info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::with_kind(HtmlError::NotFound, "RowNotFound".into()),
            sqlx::Error::Database(e) => {
                if e.is_unique_violation() {
                    Self::with_kind(HtmlError::InvalidRequest, "Entry already exists".into())
                } else if e.is_check_violation() {
                    Self::with_kind(
                        HtmlError::InvalidRequest,
                        format!("Constraint violated: {}", e.constraint().unwrap_or("check")),
                    )
                } else if e.is_foreign_key_violation() {
                    Self::with_kind(HtmlError::NotFound, "Referenced entry doesn't exist".into())
                } else {
                    Self::new(format!("{e}"))
                }
            }
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new("Pool timed out".into()),
            sqlx::Error::PoolClosed => Self::new("Pool closed".into()),
            sqlx::Error::WorkerCrashed => Self::new("Worker crashed".into()),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new("Unknown error".into()),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        if value.kind == HtmlError::InternalServerError {
            log::error!("Query failed: {}", value.info);
        }
        value.kind.new(&value.info)
    }
}

#[derive(Debug)]
pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        log::error!("Cache failed: {}", value.info);
        HtmlError::InternalServerError.new(&value.info)
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Recovery filter turning rejections into `{"detail": ...}` replies.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if let Some(e) = err.find::<Error>() {
        (
            e.status(),
            e.info.clone().unwrap_or_else(|| e.status().to_string()),
        )
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, HtmlError::NotFound.to_string())
    } else if let Some(e) = err.find::<reject::MissingCookie>() {
        (StatusCode::UNAUTHORIZED, e.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            String::from("Method not allowed"),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            HtmlError::InternalServerError.to_string(),
        )
    };

    Ok(reply::with_status(
        reply::json(&ErrorBody { detail }),
        status,
    ))
}
