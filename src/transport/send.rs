use std::sync::LazyLock;

use regex::Regex;

use super::money::fix_currency;
use crate::domain::{Cost, MessageText, Money, PreparedRecipients, SendOutcome, SendType};

/// The message textarea is renamed per session; its name authorizes the
/// subsequent send and must be echoed back as the body's field name.
static MESSAGE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<textarea class="messagelargeinput" name="(\w+)" id="message""#)
        .expect("message field pattern")
});

static COST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"at a cost of (.*?)(\d+\.\d+)").expect("cost pattern"));

static INVALID_NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"invalid number\(s\) (.*?) skipped").expect("invalid numbers pattern"));

static FAILURE_REASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p>(.*?)</p>").expect("failure reason pattern"));

/// Extract the per-session message field name from the send page.
///
/// `None` means the page layout changed or the session is invalid in a way
/// the balance probe did not catch.
pub fn extract_message_field(body: &str) -> Option<String> {
    MESSAGE_FIELD
        .captures(body)
        .map(|captures| captures[1].to_owned())
}

/// Encode the send form around the per-session message field.
pub fn encode_send_form(
    message_field: &str,
    text: &MessageText,
    send_type: SendType,
    recipients: &PreparedRecipients,
) -> Vec<(String, String)> {
    vec![
        ("action".to_owned(), "Send".to_owned()),
        ("SA".to_owned(), "0".to_owned()),
        ("DR".to_owned(), "1".to_owned()),
        (SendType::FIELD.to_owned(), send_type.flag().to_owned()),
        (message_field.to_owned(), text.as_str().to_owned()),
        (PreparedRecipients::FIELD.to_owned(), recipients.joined()),
    ]
}

/// Classify a send response body.
///
/// Pure: the same body and recipient map always produce the same outcome.
pub fn classify_send_response(body: &str, recipients: &PreparedRecipients) -> SendOutcome {
    if body.contains("Message sent") {
        classify_success(body, recipients)
    } else if body.contains("Send failed") {
        let reason = FAILURE_REASON
            .captures(body)
            .map(|captures| captures[1].to_owned())
            .unwrap_or_default();
        SendOutcome::Rejected { reason }
    } else {
        SendOutcome::Unrecognized
    }
}

fn classify_success(body: &str, recipients: &PreparedRecipients) -> SendOutcome {
    let cost = extract_cost(body);
    if body.contains("sent to all recipients") {
        return SendOutcome::SentToAll { cost };
    }

    let mut failed = Vec::new();
    if let Some(captures) = INVALID_NUMBERS.captures(body) {
        for part in captures[1].split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let original = recipients.original_for(part).unwrap_or(part);
            failed.push(original.to_owned());
        }
    }

    let total = recipients.len();
    let sent = total.saturating_sub(failed.len());
    if sent > 0 {
        SendOutcome::SentToSome { sent, cost, failed }
    } else {
        SendOutcome::SentToNone { total, failed }
    }
}

/// Extract the cost from a successful send confirmation.
///
/// The free markers win over the cost pattern: a free send may still quote
/// the price the message would have cost.
pub fn extract_cost(body: &str) -> Cost {
    if body.contains("sent free") || body.contains(", free.") {
        return Cost::Free;
    }
    match COST.captures(body) {
        Some(captures) => Cost::Charged(Money {
            currency: fix_currency(&captures[1]),
            amount: captures[2].to_owned(),
        }),
        None => Cost::Unknown,
    }
}
