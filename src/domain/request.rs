use std::collections::HashMap;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Recipient list prepared for submission to the portal.
///
/// Each raw recipient is reduced to its number, converted to international
/// format, and stripped of the leading `+`. The original strings are kept,
/// keyed by the transformed number, so per-recipient failures can be
/// reported back in the caller's own format.
///
/// Invariant: the submission list is non-empty, duplicate-free, and keeps
/// first-seen order.
pub struct PreparedRecipients {
    submission: Vec<String>,
    originals: HashMap<String, String>,
}

impl PreparedRecipients {
    /// Form field name used by the send form (`RN`).
    pub const FIELD: &'static str = "RN";

    /// Prepare raw recipients for submission.
    ///
    /// `default_prefix` is the international calling prefix (e.g. `+44`)
    /// applied to national numbers.
    pub fn prepare(
        recipients: &[String],
        default_prefix: &str,
    ) -> Result<Self, ValidationError> {
        if recipients.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }

        let mut submission = Vec::new();
        let mut originals = HashMap::new();
        for raw in recipients {
            let number = recipient_number(raw);
            if number.is_empty() {
                return Err(ValidationError::InvalidRecipient { input: raw.clone() });
            }
            let international = national_to_international(default_prefix, &number);
            let transformed = international
                .strip_prefix('+')
                .unwrap_or(&international)
                .to_owned();
            if !submission.contains(&transformed) {
                submission.push(transformed.clone());
            }
            originals.insert(transformed, raw.clone());
        }

        Ok(Self {
            submission,
            originals,
        })
    }

    /// The transformed numbers in submission order.
    pub fn transformed(&self) -> &[String] {
        &self.submission
    }

    /// Comma-joined submission value for the `RN` field.
    pub fn joined(&self) -> String {
        self.submission.join(",")
    }

    /// Number of distinct recipients being submitted.
    pub fn len(&self) -> usize {
        self.submission.len()
    }

    /// True when no recipients are being submitted. Never holds for a
    /// value produced by [`PreparedRecipients::prepare`].
    pub fn is_empty(&self) -> bool {
        self.submission.is_empty()
    }

    /// The caller's original string for a transformed number.
    pub fn original_for(&self, transformed: &str) -> Option<&str> {
        self.originals.get(transformed).map(String::as_str)
    }
}

/// Reduce a raw recipient to its number: take the `<...>` part of a
/// `Name <number>` display form if present, then drop separator characters.
fn recipient_number(raw: &str) -> String {
    let raw = raw.trim();
    let number = match (raw.find('<'), raw.rfind('>')) {
        (Some(start), Some(end)) if start < end => &raw[start + 1..end],
        _ => raw,
    };

    let mut out = String::new();
    for ch in number.trim().chars() {
        if ch.is_ascii_digit() || (ch == '+' && out.is_empty()) {
            out.push(ch);
        }
    }
    out
}

/// Convert a cleaned number to international format with a leading `+`.
fn national_to_international(default_prefix: &str, number: &str) -> String {
    if number.starts_with('+') {
        number.to_owned()
    } else if let Some(rest) = number.strip_prefix("00") {
        format!("+{rest}")
    } else if let Some(rest) = number.strip_prefix('0') {
        format!("{default_prefix}{rest}")
    } else {
        format!("{default_prefix}{number}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Host command asking for a message to be sent.
pub struct SendCommand {
    /// Recipients as the host supplied them (display form allowed).
    pub recipients: Vec<String>,
    /// Message body.
    pub text: String,
    /// The host's default sender number; used as the login identifier.
    pub default_sender: String,
    /// International calling prefix applied to national recipient numbers.
    pub default_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Host command asking for a balance/status refresh.
pub struct UpdateCommand {
    /// The host's default sender number; used as the login identifier.
    pub default_sender: String,
    /// International calling prefix (unused by the update itself, carried
    /// for parity with [`SendCommand`]).
    pub default_prefix: String,
}
