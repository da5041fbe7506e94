use log::debug;
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::logging::RequestId;
use crate::model::common::election::{ElectionStatus, Operation, TrusteeId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Conflict(#[from] Conflict),
    #[error("Not enough decryption shares. Need {threshold}, have {submitted}")]
    ThresholdNotMet { submitted: u32, threshold: u32 },
    #[error("Decryption share from trustee {0} failed verification")]
    InvalidShare(TrusteeId),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Storage failure: {0}")]
    Store(String),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

/// Operations refused because of the election's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("Key ceremony has already been run for this election")]
    CeremonyAlreadyRun,
    #[error("Election has already been tallied")]
    AlreadyTallied,
    #[error("Election is already {0}")]
    NoOpTransition(ElectionStatus),
    #[error("Cannot move election from {from} to {to}")]
    IllegalTransition {
        from: ElectionStatus,
        to: ElectionStatus,
    },
    #[error("User {0} is already a trustee of this election")]
    DuplicateTrustee(String),
    #[error("Trustee roster already holds all {0} trustees")]
    RosterFull(u32),
    #[error("Key ceremony needs exactly {need} trustees, roster has {have}")]
    InsufficientTrustees { have: u32, need: u32 },
    #[error("Trustee has already submitted a decryption share")]
    AlreadySubmitted,
    #[error("Trustee holds no key share")]
    NoKeyShare,
    #[error("Cannot {operation} while election is {status}")]
    NotPermitted {
        operation: Operation,
        status: ElectionStatus,
    },
    #[error("Election results not available. Status: {0}")]
    ResultsNotAvailable(ElectionStatus),
}

/// The stable error taxonomy exposed to API clients.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "ValidationError")]
    Validation,
    StateConflict,
    ThresholdNotMet,
    NotFound,
    #[serde(rename = "UpstreamFailure")]
    Upstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::StateConflict => "StateConflict",
            Self::ThresholdNotMet => "ThresholdNotMet",
            Self::NotFound => "NotFound",
            Self::Upstream => "UpstreamFailure",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidShare(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::StateConflict,
            Self::ThresholdNotMet { .. } => ErrorKind::ThresholdNotMet,
            Self::Crypto(_) | Self::Db(_) | Self::Store(_) | Self::Timeout(_) => ErrorKind::Upstream,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Timeout(_) => Status::GatewayTimeout,
            _ => match self.kind() {
                ErrorKind::Validation => Status::BadRequest,
                ErrorKind::StateConflict | ErrorKind::ThresholdNotMet => Status::Conflict,
                ErrorKind::NotFound => Status::NotFound,
                ErrorKind::Upstream => Status::BadGateway,
            },
        }
    }

    /// Could retrying the same call plausibly succeed?
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Upstream
    }
}

/// The kind of failure a request ended with, cached for the response log.
#[derive(Debug, Copy, Clone, Default)]
pub struct FailureKind(pub Option<ErrorKind>);

#[derive(Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    detail: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let kind = self.kind();
        req.local_cache(|| FailureKind(Some(kind)));
        debug!("req{} failed: {self}", RequestId::of(req));
        let body = ErrorBody {
            kind,
            detail: self.to_string(),
        };
        Custom(self.status(), Json(body)).respond_to(req)
    }
}
