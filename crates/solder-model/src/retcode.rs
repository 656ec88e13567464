//! Response status strings and return-code classes.
//!
//! The protocol defines WebSocket-style return codes; some
//! implementations answer with HTTP-style codes instead, which this
//! library accepts but flags with a compatibility warning.

/// Status string for a completed synchronous call.
pub const STATUS_OK: &str = "ok";
/// Status string for an accepted asynchronous call.
pub const STATUS_ASYNC: &str = "async";
/// Status string for a failed call.
pub const STATUS_FAILED: &str = "failed";

/// Successful call.
pub const RETCODE_SUCCESS: i64 = 0;
/// Call accepted for asynchronous handling.
pub const RETCODE_ASYNC: i64 = 1;
/// Malformed request (missing or invalid parameters).
pub const RETCODE_BAD_REQUEST: i64 = 1400;
/// The action is not supported by the implementation.
pub const RETCODE_UNSUPPORTED: i64 = 1404;

/// HTTP-style alias of [`RETCODE_SUCCESS`].
pub const HTTP_RETCODE_SUCCESS: i64 = 200;
/// HTTP-style alias of [`RETCODE_ASYNC`].
pub const HTTP_RETCODE_ASYNC: i64 = 202;
/// HTTP-style alias of [`RETCODE_BAD_REQUEST`].
pub const HTTP_RETCODE_BAD_REQUEST: i64 = 400;
/// HTTP-style alias of [`RETCODE_UNSUPPORTED`].
pub const HTTP_RETCODE_UNSUPPORTED: i64 = 404;
