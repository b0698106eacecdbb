use crate::domain::value::{Cost, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Whether the cookie session is currently authenticated.
///
/// The portal has no auth-status endpoint; this is inferred from whether
/// the balance probe matched, and holds only until the next probe.
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of the balance probe.
///
/// A matched balance implies a live session. `balance` is `None` exactly
/// when the probe failed to match or the request itself failed.
pub struct BalanceProbe {
    pub state: SessionState,
    pub balance: Option<Money>,
}

impl BalanceProbe {
    pub(crate) fn logged_out() -> Self {
        Self {
            state: SessionState::LoggedOut,
            balance: None,
        }
    }

    /// True when the probe found an authenticated session.
    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Classification of a send response body.
///
/// Produced by a pure function of the body and the prepared recipients;
/// `failed` lists recipients in the caller's original format.
pub enum SendOutcome {
    /// The portal confirmed delivery to every recipient.
    SentToAll { cost: Cost },
    /// Delivered to some recipients; the rest were skipped as invalid.
    SentToSome {
        sent: usize,
        cost: Cost,
        failed: Vec<String>,
    },
    /// Every recipient was skipped.
    SentToNone { total: usize, failed: Vec<String> },
    /// The portal refused the send outright.
    Rejected { reason: String },
    /// The body matched neither the success nor the failure shape.
    Unrecognized,
}
