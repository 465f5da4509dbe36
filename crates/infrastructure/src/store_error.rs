use contractdesk_core::AppError;

/// Maps a sqlx failure into the application error taxonomy.
///
/// Connectivity problems become `Unavailable` so callers can retry them.
/// Data exceptions and integrity violations (SQLSTATE classes 22 and 23)
/// become `Validation`, which is never retried. Everything else is
/// `Internal`.
pub(crate) fn map_store_error(context: &str, error: sqlx::Error) -> AppError {
    match &error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Protocol(_)
        | sqlx::Error::WorkerCrashed => AppError::Unavailable(format!("{context}: {error}")),
        sqlx::Error::Database(database_error) => {
            from_sqlstate(database_error.code().as_deref(), format!("{context}: {error}"))
        }
        _ => AppError::Internal(format!("{context}: {error}")),
    }
}

fn from_sqlstate(code: Option<&str>, message: String) -> AppError {
    match code.map(|code| code.get(..2).unwrap_or(code)) {
        Some("22" | "23") => AppError::Validation(message),
        Some("08" | "53" | "57") => AppError::Unavailable(message),
        _ => AppError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use contractdesk_core::AppError;

    use super::{from_sqlstate, map_store_error};

    #[test]
    fn connectivity_failures_are_unavailable() {
        assert!(matches!(
            map_store_error("failed to append activity event", sqlx::Error::PoolTimedOut),
            AppError::Unavailable(_)
        ));
        assert!(matches!(
            map_store_error("failed to purge", sqlx::Error::PoolClosed),
            AppError::Unavailable(_)
        ));
    }

    #[test]
    fn decoding_failures_are_internal() {
        let error = map_store_error("failed to list", sqlx::Error::RowNotFound);

        assert!(matches!(error, AppError::Internal(_)));
        assert!(error.to_string().contains("failed to list"));
    }

    #[test]
    fn data_exceptions_are_not_retryable() {
        let too_long = from_sqlstate(Some("22001"), "value too long".to_owned());
        let bad_timestamp = from_sqlstate(Some("22007"), "invalid datetime".to_owned());

        assert!(matches!(too_long, AppError::Validation(_)));
        assert!(matches!(bad_timestamp, AppError::Validation(_)));
        assert!(!too_long.is_retryable());
    }

    #[test]
    fn sqlstate_classes_map_to_error_kinds() {
        assert!(matches!(
            from_sqlstate(Some("23505"), "duplicate".to_owned()),
            AppError::Validation(_)
        ));
        assert!(matches!(
            from_sqlstate(Some("08006"), "connection failure".to_owned()),
            AppError::Unavailable(_)
        ));
        assert!(matches!(
            from_sqlstate(Some("57P01"), "admin shutdown".to_owned()),
            AppError::Unavailable(_)
        ));
        assert!(matches!(
            from_sqlstate(Some("42P01"), "undefined table".to_owned()),
            AppError::Internal(_)
        ));
        assert!(matches!(from_sqlstate(None, "unknown".to_owned()), AppError::Internal(_)));
    }
}
