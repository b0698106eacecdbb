use crate::domain::{LoginId, Password};

/// Substring present in the account page only after a successful login.
pub const WELCOME_MARKER: &str = "Welcome back";

/// Encode the login form. Field names and the two `_sp_` flags are what
/// the portal's own login page submits.
pub fn encode_login_form(login: &LoginId, password: &Password) -> Vec<(String, String)> {
    vec![
        (LoginId::FIELD.to_owned(), login.as_str().to_owned()),
        (Password::FIELD.to_owned(), password.as_str().to_owned()),
        ("rememberSession".to_owned(), "yes".to_owned()),
        ("_sp_errorJS".to_owned(), "0".to_owned()),
        ("_sp_tooltip_init".to_owned(), "1".to_owned()),
    ]
}

/// Whether a login response body indicates an authenticated session.
pub fn login_succeeded(body: &str) -> bool {
    body.contains(WELCOME_MARKER)
}
