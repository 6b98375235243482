//! Ordered request validation chain
//!
//! Each validator pairs a boolean condition with the HTTP status code and
//! message returned when it fails. Validators are evaluated strictly in
//! declaration order and evaluation stops at the first failure, so a later
//! validator with side effects (token consumption) never runs for a
//! request that was already rejected.

use std::panic::{catch_unwind, AssertUnwindSafe};

use axum::http::StatusCode;

pub struct RequestValidator<'a> {
    condition: Box<dyn Fn() -> bool + Send + 'a>,
    pub error_code: StatusCode,
    pub error_message: String,
}

impl<'a> RequestValidator<'a> {
    pub fn new(
        condition: impl Fn() -> bool + Send + 'a,
        error_code: StatusCode,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            condition: Box::new(condition),
            error_code,
            error_message: error_message.into(),
        }
    }

    /// Evaluate the condition. A panicking condition counts as a failure
    /// rather than propagating to the caller.
    pub fn test(&self) -> bool {
        catch_unwind(AssertUnwindSafe(|| (self.condition)())).unwrap_or(false)
    }
}

/// First failing validator in declaration order, if any. Validators after
/// the failing one are not evaluated.
pub fn first_failure<'v, 'a>(
    validators: &'v [RequestValidator<'a>],
) -> Option<&'v RequestValidator<'a>> {
    validators.iter().find(|validator| !validator.test())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn test_passing_chain_has_no_failure() {
        let validators = [
            RequestValidator::new(|| true, StatusCode::METHOD_NOT_ALLOWED, "method"),
            RequestValidator::new(|| true, StatusCode::NOT_FOUND, "pathname"),
        ];
        assert!(first_failure(&validators).is_none());
    }

    #[test]
    fn test_first_failure_wins() {
        let validators = [
            RequestValidator::new(|| true, StatusCode::METHOD_NOT_ALLOWED, "method"),
            RequestValidator::new(|| false, StatusCode::BAD_REQUEST, "params"),
            RequestValidator::new(|| false, StatusCode::FORBIDDEN, "token"),
        ];
        let failure = first_failure(&validators).expect("second validator fails");
        assert_eq!(failure.error_code, StatusCode::BAD_REQUEST);
        assert_eq!(failure.error_message, "params");
    }

    #[test]
    fn test_validators_after_failure_are_not_evaluated() {
        let evaluated = AtomicBool::new(false);
        let validators = [
            RequestValidator::new(|| false, StatusCode::NOT_FOUND, "pathname"),
            RequestValidator::new(
                || {
                    evaluated.store(true, Ordering::SeqCst);
                    true
                },
                StatusCode::FORBIDDEN,
                "token",
            ),
        ];
        let failure = first_failure(&validators).expect("first validator fails");
        assert_eq!(failure.error_code, StatusCode::NOT_FOUND);
        assert!(!evaluated.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panicking_condition_fails_closed() {
        let validators = [RequestValidator::new(
            || panic!("condition blew up"),
            StatusCode::FORBIDDEN,
            "token",
        )];
        let failure = first_failure(&validators).expect("panic counts as failure");
        assert_eq!(failure.error_code, StatusCode::FORBIDDEN);
    }
}
