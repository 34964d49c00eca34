//! Storage-specific error type wrapping sqlx errors.

use lightcontrol_domain::error::LightControlError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for LightControlError {
    fn from(err: StorageError) -> Self {
        Self::Store(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_into_store_error() {
        let err: LightControlError = StorageError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, LightControlError::Store(_)));
    }
}
