//! Unit tests for JsError and ErrorKind

use core_types::{ErrorKind, JsError, JsResult};

#[test]
fn test_error_kind_equality() {
    assert_eq!(ErrorKind::TypeError, ErrorKind::TypeError);
    assert_ne!(ErrorKind::TypeError, ErrorKind::RangeError);
}

#[test]
fn test_js_error_constructors() {
    assert_eq!(JsError::type_error("a").kind, ErrorKind::TypeError);
    assert_eq!(JsError::range_error("b").kind, ErrorKind::RangeError);
    assert_eq!(
        JsError::new(ErrorKind::InternalError, "c").kind,
        ErrorKind::InternalError
    );
}

#[test]
fn test_js_error_is_std_error() {
    fn source_of(err: &dyn std::error::Error) -> String {
        err.to_string()
    }
    let error = JsError::type_error("cannot read property 'x' of undefined");
    assert_eq!(
        source_of(&error),
        "TypeError: cannot read property 'x' of undefined"
    );
}

#[test]
fn test_question_mark_propagation() {
    fn inner() -> JsResult<i32> {
        Err(JsError::type_error("boom"))
    }
    fn outer() -> JsResult<i32> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert_eq!(outer().unwrap_err().message, "boom");
}
