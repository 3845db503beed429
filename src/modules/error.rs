use derive_more::Error;
use derive_more::with_trait::Display;

#[derive(Debug, Display, Error)]
pub enum ConsoleError {
    #[display("gateway unreachable: {detail}")]
    Unreachable { detail: String },

    #[display("malformed response: {detail}")]
    Malformed { detail: String },

    #[display("unexpected status {status} from {path}")]
    UnexpectedStatus { status: u16, path: String },

    #[display("request abandoned, session closed")]
    Cancelled,

    #[display("console fault: {detail}")]
    Fatal { detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Shown to the user as a notice; the console keeps running.
    Recoverable,
    Silent,
    Fatal,
}

impl ConsoleError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed { detail: detail.into() }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::Unreachable { detail: detail.into() }
    }

    pub fn fatal(detail: impl Into<String>) -> Self {
        Self::Fatal { detail: detail.into() }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ConsoleError::Unreachable { .. }
            | ConsoleError::Malformed { .. }
            | ConsoleError::UnexpectedStatus { .. } => Severity::Recoverable,
            ConsoleError::Cancelled => Severity::Silent,
            ConsoleError::Fatal { .. } => Severity::Fatal,
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ConsoleError::malformed(err.to_string());
        }
        if let Some(status) = err.status() {
            let path = err.url().map(|u| u.path().to_string()).unwrap_or_default();
            return ConsoleError::UnexpectedStatus {
                status: status.as_u16(),
                path,
            };
        }
        ConsoleError::unreachable(err.to_string())
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::malformed(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ConsoleError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::Http(resp) => ConsoleError::UnexpectedStatus {
                status: resp.status().as_u16(),
                path: "/ws/stats".to_string(),
            },
            WsError::Utf8 => ConsoleError::malformed("stats frame is not valid UTF-8"),
            other => ConsoleError::unreachable(other.to_string()),
        }
    }
}

/// User-visible, non-blocking message raised by a recoverable failure.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("[{kind}] {message}")]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NoticeKind {
    #[display("network")]
    Network,
    #[display("payload")]
    Payload,
    #[display("status")]
    Status,
    #[display("input")]
    Input,
}

impl Notice {
    pub fn input(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Input,
            message: message.into(),
        }
    }

    /// `None` for errors that are not surfaced as notices.
    pub fn from_error(err: &ConsoleError) -> Option<Self> {
        let kind = match err {
            ConsoleError::Unreachable { .. } => NoticeKind::Network,
            ConsoleError::Malformed { .. } => NoticeKind::Payload,
            ConsoleError::UnexpectedStatus { .. } => NoticeKind::Status,
            ConsoleError::Cancelled | ConsoleError::Fatal { .. } => return None,
        };
        Some(Self {
            kind,
            message: err.to_string(),
        })
    }
}
