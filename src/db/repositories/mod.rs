use crate::error::Error;

pub mod audit;
pub mod car_details;
pub mod cameras;
pub mod clients;
pub mod error_messages;
pub mod history;
pub mod present_cars;
pub mod settings;
pub mod signs;
pub mod users;
pub mod zone_images;
pub mod zones;

/// Map an INSERT failure; a unique-key clash becomes `AlreadyExists`
pub(crate) fn map_insert_error(e: sqlx::Error, what: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::AlreadyExists(format!("{} already exists", what))
        }
        _ => Error::Database(format!("Failed to create {}: {}", what, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_errors_stay_database_errors() {
        let err = map_insert_error(sqlx::Error::RowNotFound, "Zone 5");
        assert!(matches!(err, Error::Database(ref message) if message.starts_with("Failed to create Zone 5")));
    }
}
