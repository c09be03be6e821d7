use std::error::Error;

pub mod access;
pub mod auth;
pub mod client;
pub mod database;
pub mod ranking;

#[cfg(test)]
pub(crate) mod mock;

#[cfg(test)]
mod client_tests;

/// Failure taxonomy of the domain operations. The web layer maps each
/// variant to a distinct status and message; nothing here is ever
/// swallowed silently.
#[derive(Debug)]
pub enum RequestError {
    /// A referenced station, user or assignment does not resolve.
    NotFound,
    /// Assignment target does not hold the station-manager role.
    InvalidRole,
    /// Assignment target is deactivated.
    InactiveManager,
    /// Removal attempted while no assignment is active.
    NoActiveAssignment,
    /// A domain value is out of range (negative price, bad coordinate).
    InvalidValue(&'static str),
    /// Login with an unknown email or a wrong password.
    InvalidCredentials,
    Other(Box<dyn Error + Send + Sync>),
}

impl RequestError {
    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }
}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            database::DatabaseError::Other(why) => Self::Other(why),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;

/// Collapses `NotFound` into `None`, for lookups where absence is a
/// regular outcome rather than a failure.
pub fn not_found_to_none<O>(result: RequestResult<O>) -> RequestResult<Option<O>> {
    if let Err(RequestError::NotFound) = result {
        Ok(None)
    } else {
        result.map(Some)
    }
}
