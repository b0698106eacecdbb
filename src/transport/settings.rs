use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::SendType;

/// Substring confirming the settings form was accepted.
pub const SAVED_MARKER: &str = "Your details have been updated";

static INPUT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input value="([^"]*)" name="([^"]*)">"#).expect("input field pattern")
});

static SELECT_SEND_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<select[^>]*id="sendType"[^>]*>(.*?)</select>"#)
        .expect("sendType select pattern")
});

static SELECT_SEND_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<select[^>]*id="sendFrom"[^>]*>(.*?)</select>"#)
        .expect("sendFrom select pattern")
});

static OPTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<option[^>]*value="([^"]*)"[^>]*>"#).expect("option pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Field values scraped from the settings page, used as a write-through
/// snapshot when resubmitting the form.
pub struct SettingsForm {
    fields: HashMap<String, String>,
}

impl SettingsForm {
    /// A scraped field value, empty string when the page did not carry it.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// The account's current `sendType` select value, if scraped.
    pub fn send_type(&self) -> Option<&str> {
        self.fields.get("sendType").map(String::as_str)
    }
}

/// Scrape the settings page into a field map: every `<input value=".."
/// name="..">` pair plus the current values of the `sendType` and
/// `sendFrom` selects.
pub fn parse_settings_form(body: &str) -> SettingsForm {
    let mut fields = HashMap::new();
    for captures in INPUT_FIELD.captures_iter(body) {
        fields.insert(captures[2].to_owned(), captures[1].to_owned());
    }

    if let Some(value) = select_value(&SELECT_SEND_TYPE, body) {
        fields.insert("sendType".to_owned(), value);
    }
    if let Some(value) = select_value(&SELECT_SEND_FROM, body) {
        fields.insert("sendFrom".to_owned(), value);
    }

    SettingsForm { fields }
}

/// The selected option of a select block, falling back to its first option.
fn select_value(select: &Regex, body: &str) -> Option<String> {
    let block = select.captures(body)?;
    let block = block.get(1)?.as_str();

    for captures in OPTION_TAG.captures_iter(block) {
        if captures[0].contains("selected") {
            return Some(captures[1].to_owned());
        }
    }
    OPTION_TAG
        .captures(block)
        .map(|captures| captures[1].to_owned())
}

/// Encode the settings form with the desired send type, echoing the other
/// scraped fields back unchanged.
pub fn encode_settings_form(form: &SettingsForm, desired: SendType) -> Vec<(String, String)> {
    vec![
        ("sendFrom".to_owned(), form.field("sendFrom").to_owned()),
        ("sendType".to_owned(), desired.flag().to_owned()),
        ("firstName".to_owned(), form.field("firstName").to_owned()),
        ("lastName".to_owned(), form.field("lastName").to_owned()),
        (
            "emailAddress".to_owned(),
            form.field("emailAddress").to_owned(),
        ),
        ("action".to_owned(), "saveSettings".to_owned()),
        ("_sp_errorJS".to_owned(), "0".to_owned()),
        ("_sp_tooltip_init".to_owned(), "0".to_owned()),
    ]
}

/// Whether a settings POST response confirms the update.
pub fn settings_saved(body: &str) -> bool {
    body.contains(SAVED_MARKER)
}
