use anyhow::{anyhow, Result};
use std::str::FromStr;

/// What to do when an authorized request fails.
///
/// Every policy is one-shot: at most one token refresh and one repeat of
/// the request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Surface the first failure.
    Never,
    /// Refresh the token and repeat once on HTTP 401/403 only.
    #[default]
    OnAuthFailure,
    /// Refresh and repeat once on any failure, transport errors included.
    OnAnyFailure,
}

impl FromStr for RetryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "never" | "none" | "off" => Ok(Self::Never),
            "auth" | "on_auth_failure" => Ok(Self::OnAuthFailure),
            "any" | "always" | "on_any_failure" => Ok(Self::OnAnyFailure),
            other => Err(anyhow!(
                "unknown retry policy '{}': expected 'never', 'auth' or 'any'",
                other
            )),
        }
    }
}

impl RetryPolicy {
    /// `status` is `None` for transport failures (connect, DNS, timeout).
    pub fn should_retry_status(&self, status: Option<u16>) -> bool {
        match self {
            Self::Never => false,
            Self::OnAuthFailure => matches!(status, Some(401) | Some(403)),
            Self::OnAnyFailure => true,
        }
    }

    pub fn should_retry(&self, err: &ureq::Error) -> bool {
        let status = match err {
            ureq::Error::Status(code, _) => Some(*code),
            ureq::Error::Transport(_) => None,
        };
        self.should_retry_status(status)
    }
}
