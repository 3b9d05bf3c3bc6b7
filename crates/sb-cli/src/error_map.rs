use sb_api::{BundleError, ErrorKind};

pub(crate) fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn emit_error(error: BundleError) -> i32 {
    log::debug!("command failed: {}", error);
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code());
    println!("ERROR_MSG_JSON:{}", json_string(&error.message));
    1
}

pub(crate) fn invalid_argument(message: impl Into<String>) -> BundleError {
    BundleError::new(ErrorKind::InvalidArgument, message)
}

pub(crate) fn round_trip_mismatch(detail: impl Into<String>) -> BundleError {
    BundleError::new(
        ErrorKind::InvariantViolation,
        format!("Round trip changed the container: {}", detail.into()),
    )
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(BundleError::new(ErrorKind::KeyNotFound, "missing"));
        assert_eq!(code, 1);
    }

    #[test]
    fn helpers_keep_error_kinds() {
        assert_eq!(invalid_argument("x").kind, ErrorKind::InvalidArgument);
        let mismatch = round_trip_mismatch("order");
        assert_eq!(mismatch.kind, ErrorKind::InvariantViolation);
        assert!(mismatch.message.ends_with("order"));
        assert_eq!(json_string("a\"b"), "\"a\\\"b\"");
    }
}
