//! Transport layer: the portal's wire format. There is no structured API;
//! every response is HTML or free text, so this layer is form encoders and
//! regex extraction functions, one per field the client needs.

mod balance;
mod login;
mod money;
mod send;
mod settings;

pub use balance::parse_balance;
pub use login::{encode_login_form, login_succeeded};
pub use send::{classify_send_response, encode_send_form, extract_message_field};
pub use settings::{
    SettingsForm, encode_settings_form, parse_settings_form, settings_saved,
};
