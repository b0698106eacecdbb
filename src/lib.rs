//! Typed Rust client for the Fishtext mobile web portal.
//!
//! The portal exposes no structured API: the session lives in cookies,
//! login state is inferred by probing the balance page, sends go through a
//! multi-step HTML form emulation, and every outcome is read out of free
//! text with regular expressions. The design keeps that protocol in three
//! layers: a domain layer of strong types, a transport layer for the
//! scraping and form encoding, and a client layer orchestrating requests,
//! plus a connector layer for gateway hosts.
//!
//! ```rust,no_run
//! use fishtext::{FishtextClient, LoginId, MessageText, Password, PreparedRecipients, SendType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fishtext::FishtextError> {
//!     let client = FishtextClient::new()?;
//!     let login = LoginId::new("+447123456789")?;
//!     let password = Password::new("secret")?;
//!     client.ensure_logged_in(&login, &password, false).await?;
//!
//!     let recipients = PreparedRecipients::prepare(&["+447000000001".to_owned()], "+44")?;
//!     let text = MessageText::new("hello")?;
//!     let cost = client.send(&text, &recipients, SendType::Paid).await?;
//!     println!("sent at cost {cost}");
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod connector;
pub mod domain;
mod transport;

pub use client::{
    FishtextClient, FishtextClientBuilder, FishtextError, RESPONSE_ENCODING, USER_AGENT,
};
pub use connector::{
    Connector, ConnectorPrefs, ConnectorSpec, ConnectorStatus, MemoryPrefsStore, PrefsStore,
    SendReceipt, SubConnector, store_password,
};
pub use domain::{
    BalanceProbe, Cost, FreeMode, LoginId, MessageText, Money, Password, PreparedRecipients,
    SendCommand, SendOutcome, SendType, SessionState, UpdateCommand, ValidationError,
};
