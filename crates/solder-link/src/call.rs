//! Call policies and response classification.
//!
//! The OneBot 11 API defines three calling conventions, selected by a
//! suffix on the wire action name, and two layers of response
//! classification: the numeric return code (with HTTP-style aliases some
//! implementations answer with) and the status string.

use serde::de::DeserializeOwned;
use serde_json::Value;

use solder_model::ApiResponse;
use solder_model::retcode::{
    HTTP_RETCODE_ASYNC, HTTP_RETCODE_BAD_REQUEST, HTTP_RETCODE_SUCCESS, HTTP_RETCODE_UNSUPPORTED,
    RETCODE_ASYNC, RETCODE_BAD_REQUEST, RETCODE_SUCCESS, RETCODE_UNSUPPORTED, STATUS_ASYNC,
    STATUS_FAILED, STATUS_OK,
};

use crate::error::CallError;

/// The calling convention of one API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallPolicy {
    /// Synchronous (or implementation-chosen) handling.
    #[default]
    Default,
    /// Fire-and-forget: the peer answers `async` before handling.
    Async,
    /// Fire-and-forget through the peer's rate limiter.
    RateLimited,
}

impl CallPolicy {
    /// The suffix appended to the wire action name.
    pub const fn suffix(&self) -> &'static str {
        match self {
            CallPolicy::Default => "",
            CallPolicy::Async => "_async",
            CallPolicy::RateLimited => "_rate_limited",
        }
    }
}

fn peer_message(response: &ApiResponse) -> String {
    response
        .message
        .clone()
        .unwrap_or_else(|| "no message from peer".to_string())
}

fn http_compat_note(got: i64, expected: i64) -> String {
    format!(
        " (implementation answered HTTP-style retcode {got} instead of WebSocket-style {expected})"
    )
}

/// Classifies the numeric return code.
///
/// Success and async-accepted codes pass through for status handling;
/// every other class maps to its error. Codes outside the known classes
/// are the peer's free-form failure space when the status says `failed`,
/// and a protocol error otherwise.
pub(crate) fn check_retcode(response: &ApiResponse) -> Result<(), CallError> {
    match response.retcode {
        RETCODE_SUCCESS | RETCODE_ASYNC | HTTP_RETCODE_SUCCESS | HTTP_RETCODE_ASYNC => Ok(()),
        RETCODE_UNSUPPORTED => Err(CallError::UnsupportedOperation {
            message: peer_message(response),
        }),
        HTTP_RETCODE_UNSUPPORTED => Err(CallError::UnsupportedOperation {
            message: peer_message(response)
                + &http_compat_note(HTTP_RETCODE_UNSUPPORTED, RETCODE_UNSUPPORTED),
        }),
        RETCODE_BAD_REQUEST => Err(CallError::InvalidArgument {
            message: peer_message(response),
        }),
        HTTP_RETCODE_BAD_REQUEST => Err(CallError::InvalidArgument {
            message: peer_message(response)
                + &http_compat_note(HTTP_RETCODE_BAD_REQUEST, RETCODE_BAD_REQUEST),
        }),
        other => {
            if response.status == STATUS_FAILED {
                Err(CallError::OperationFailed {
                    message: peer_message(response),
                })
            } else {
                Err(CallError::Protocol(format!(
                    "unexpected response return code {other}"
                )))
            }
        }
    }
}

/// Decodes the payload of a default-policy call.
///
/// `ok` deserializes `data` into the expected type, treating an absent
/// payload as null so payload-less actions decode to `()`. `async` is
/// only acceptable when the expected type itself decodes from null.
pub(crate) fn decode_data<R: DeserializeOwned>(response: ApiResponse) -> Result<R, CallError> {
    match response.status.as_str() {
        STATUS_OK => {
            let data = response.data.unwrap_or(Value::Null);
            serde_json::from_value(data).map_err(CallError::from)
        }
        STATUS_ASYNC => {
            serde_json::from_value::<R>(Value::Null).map_err(|_| CallError::UnexpectedStatus {
                status: STATUS_ASYNC.to_string(),
                message: "peer deferred an action that returns a payload".to_string(),
            })
        }
        STATUS_FAILED => Err(CallError::OperationFailed {
            message: peer_message(&response),
        }),
        other => Err(CallError::Protocol(format!(
            "unexpected response status `{other}`"
        ))),
    }
}

/// Checks the response of an `async`/`rate_limited` call.
///
/// These policies expect the peer to defer; a synchronous `ok` answer
/// violates the contract.
pub(crate) fn expect_deferred(response: ApiResponse) -> Result<(), CallError> {
    match response.status.as_str() {
        STATUS_ASYNC => Ok(()),
        STATUS_OK => Err(CallError::UnexpectedStatus {
            status: STATUS_OK.to_string(),
            message: "peer answered synchronously to a deferred call".to_string(),
        }),
        STATUS_FAILED => Err(CallError::OperationFailed {
            message: peer_message(&response),
        }),
        other => Err(CallError::Protocol(format!(
            "unexpected response status `{other}`"
        ))),
    }
}
