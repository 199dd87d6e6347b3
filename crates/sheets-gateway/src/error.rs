//! Error taxonomy of the gateway: raw transport failures are classified
//! into transient and permanent remote errors, and every operation surfaces
//! a typed [`GatewayError`] that renders to a short human readable string.

use {
    crate::api::ApiError,
    std::fmt::{self, Display, Formatter},
    thiserror::Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Expected to resolve by retrying unchanged: server overload, network
    /// blips, timeouts.
    Transient,
    /// Will not resolve by retrying: bad request, not found, unauthorized.
    Permanent,
}

/// A classified failure of the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: ErrorKind,
    pub http_status: Option<u16>,
    /// Error code from the structured error payload, when the remote
    /// service bothered to populate it.
    pub remote_code: Option<i64>,
    pub remote_message: Option<String>,
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("Spreadsheet error.")?;
        if let Some(code) = self.remote_code {
            write!(f, " Code: {code}.")?;
        }
        if let Some(message) = &self.remote_message {
            write!(f, " Message: {message}.")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

impl From<ApiError> for RemoteError {
    fn from(err: ApiError) -> Self {
        match err {
            // Client errors won't get better by asking again.
            ApiError::Status { status, payload } => Self {
                kind: if (400..500).contains(&status) {
                    ErrorKind::Permanent
                } else {
                    ErrorKind::Transient
                },
                http_status: Some(status),
                remote_code: payload.as_ref().and_then(|payload| payload.code),
                remote_message: payload.and_then(|payload| payload.message),
            },
            // Timeouts, connection resets and garbled responses all fall
            // under "try again".
            ApiError::Send(err) | ApiError::Body(err) => Self {
                kind: ErrorKind::Transient,
                http_status: err.status().map(|status| status.as_u16()),
                remote_code: None,
                remote_message: Some(err.to_string()),
            },
            ApiError::Deserialize(err) => Self {
                kind: ErrorKind::Transient,
                http_status: None,
                remote_code: None,
                remote_message: Some(err.to_string()),
            },
        }
    }
}

/// Failure of one `SheetClient` operation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Bounded append partial failure: the new rows were appended but the
    /// oldest rows could not be evicted, so the tab may exceed its row
    /// limit until a later append succeeds in full.
    #[error("appended rows but failed to evict the oldest rows: {eviction}")]
    EvictionFailed { eviction: RemoteError },

    /// Raised before any network call; retrying cannot help.
    #[error("{0}")]
    Precondition(String),
}

#[cfg(test)]
mod tests {
    use {super::*, crate::api::ErrorPayload};

    fn status(status: u16, payload: Option<ErrorPayload>) -> RemoteError {
        ApiError::Status { status, payload }.into()
    }

    #[test]
    fn classifies_client_errors_as_permanent() {
        assert_eq!(status(404, None).kind, ErrorKind::Permanent);
        assert_eq!(status(400, None).kind, ErrorKind::Permanent);
        assert_eq!(status(403, None).kind, ErrorKind::Permanent);
        // The remote quota error is a client error as well; the rate limiter
        // is supposed to keep us away from it in the first place.
        assert_eq!(status(429, None).kind, ErrorKind::Permanent);
    }

    #[test]
    fn classifies_server_errors_as_transient() {
        assert_eq!(status(503, None).kind, ErrorKind::Transient);
        assert_eq!(status(500, None).kind, ErrorKind::Transient);
    }

    #[test]
    fn classifies_garbled_responses_as_transient() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let remote = RemoteError::from(ApiError::Deserialize(err));
        assert!(remote.is_transient());
    }

    #[test]
    fn renders_user_message() {
        let err = status(
            404,
            Some(ErrorPayload {
                code: Some(404),
                message: Some("Requested entity was not found".to_string()),
            }),
        );
        assert_eq!(
            err.to_string(),
            "Spreadsheet error. Code: 404. Message: Requested entity was not found."
        );
    }

    #[test]
    fn omits_absent_message_segments() {
        assert_eq!(status(500, None).to_string(), "Spreadsheet error.");
        let err = status(
            500,
            Some(ErrorPayload {
                code: Some(500),
                message: None,
            }),
        );
        assert_eq!(err.to_string(), "Spreadsheet error. Code: 500.");
    }
}
