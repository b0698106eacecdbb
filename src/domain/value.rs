use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Fishtext account login, derived from the account's phone number.
///
/// Invariant: non-empty after trimming; a leading `+` or `00` international
/// marker is stripped, since the portal expects the bare number.
pub struct LoginId(String);

impl LoginId {
    /// Form field name used by the login page (`mobile`).
    pub const FIELD: &'static str = "mobile";

    /// Create a validated [`LoginId`] from a sender phone number.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        let stripped = trimmed
            .strip_prefix('+')
            .or_else(|| trimmed.strip_prefix("00"))
            .unwrap_or(trimmed);
        if stripped.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(stripped.to_owned()))
    }

    /// Borrow the normalized login.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Fishtext account password.
///
/// Invariant: non-empty. The portal silently ignores anything beyond 12
/// characters, so the value is truncated to [`Password::MAX_LENGTH`] on
/// construction; use [`crate::connector::store_password`] when the host
/// must be told about the truncation.
pub struct Password(String);

impl Password {
    /// Form field name used by the login page (`password`).
    pub const FIELD: &'static str = "password";

    /// Longest password the portal accepts.
    pub const MAX_LENGTH: usize = 12;

    /// Create a validated [`Password`], truncating to [`Password::MAX_LENGTH`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value.chars().take(Self::MAX_LENGTH).collect()))
    }

    /// Borrow the (possibly truncated) password.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Outgoing message text.
///
/// Invariant: non-empty after trimming and at most
/// [`MessageText::MAX_LENGTH`] characters. The original value (including
/// whitespace) is preserved.
pub struct MessageText(String);

impl MessageText {
    /// Longest message the portal accepts in one submission.
    pub const MAX_LENGTH: usize = 459;

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: "message" });
        }
        let length = value.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(ValidationError::MessageTooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }
        Ok(Self(value))
    }

    /// Borrow the message text as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// An amount of account credit as the portal displays it: a currency
/// fragment followed by a decimal amount.
///
/// Both parts are kept as strings; the portal's formatting is preserved
/// rather than re-derived.
pub struct Money {
    /// Currency symbol or text fragment preceding the amount (may be empty).
    pub currency: String,
    /// Decimal amount exactly as the portal printed it.
    pub amount: String,
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.currency, self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// What a send cost, as reported by the portal's confirmation text.
pub enum Cost {
    /// The message went out on the free tier.
    Free,
    /// The portal named a price.
    Charged(Money),
    /// The confirmation carried no recognizable cost information.
    Unknown,
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("free"),
            Self::Charged(money) => money.fmt(f),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Whether a send is billed or routed through the account's free tier.
///
/// The same flag value is used for the `ST` field of the send form and for
/// the `sendType` select on the settings page.
pub enum SendType {
    Paid,
    Free,
}

impl SendType {
    /// Form field name used by the send form (`ST`).
    pub const FIELD: &'static str = "ST";

    /// Wire value for this send type.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Paid => "1",
            Self::Free => "0",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Tri-state "send for free" preference.
///
/// `Unset` means the user never chose; sends default to paid and the
/// settings synchronizer stays off the network.
pub enum FreeMode {
    #[default]
    Unset,
    Free,
    Paid,
}

impl FreeMode {
    /// The send type this preference asks for, if any.
    pub fn send_type(self) -> Option<SendType> {
        match self {
            Self::Unset => None,
            Self::Free => Some(SendType::Free),
            Self::Paid => Some(SendType::Paid),
        }
    }
}
