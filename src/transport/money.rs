/// Substitute the HTML currency entities the portal emits for their
/// symbols. Other text fragments pass through unchanged so a new currency
/// still renders as the portal sent it.
pub fn fix_currency(raw: &str) -> String {
    raw.replace("&pound;", "\u{a3}").replace("&euro;", "\u{20ac}")
}

#[cfg(test)]
mod tests {
    use super::fix_currency;

    #[test]
    fn known_entities_become_symbols() {
        assert_eq!(fix_currency("&pound;"), "£");
        assert_eq!(fix_currency("&euro;"), "€");
    }

    #[test]
    fn unknown_text_passes_through() {
        assert_eq!(fix_currency("$"), "$");
        assert_eq!(fix_currency("credits "), "credits ");
        assert_eq!(fix_currency(""), "");
    }
}
