use refill::database::DatabaseError;

pub mod assignment;
pub mod history;
pub mod station;
pub mod token;
pub mod user;
pub mod visit;

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        _ => DatabaseError::Other(Box::new(why)),
    }
}
