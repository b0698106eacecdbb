//! Host-facing surface: capability descriptor, preference handling, and
//! the update/send operations a gateway host drives.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{FishtextClient, FishtextError};
use crate::domain::{
    Cost, FreeMode, LoginId, MessageText, Money, Password, PreparedRecipients, SendCommand,
    SendType, UpdateCommand,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// What this connector can do, for the host's capability registry.
pub struct ConnectorSpec {
    pub name: &'static str,
    pub supports_update: bool,
    pub supports_send: bool,
    pub supports_prefs: bool,
    pub sub_connectors: Vec<SubConnector>,
    pub max_message_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A virtual sub-channel of the connector.
pub struct SubConnector {
    pub id: &'static str,
    pub multi_recipient: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Readiness of the connector, derived from the stored preferences.
pub enum ConnectorStatus {
    /// Disabled by the user.
    Inactive,
    /// Enabled but missing a password.
    Enabled,
    /// Enabled and configured.
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Snapshot of the persisted preferences, passed into each operation.
///
/// The core writes back exactly two fields, through [`PrefsStore`]: the
/// truncated password and the last-applied free-send marker.
pub struct ConnectorPrefs {
    pub enabled: bool,
    pub password: String,
    /// Sender number to log in with when `login_with_default` is off.
    pub sender: Option<String>,
    /// Log in with the host's default sender instead of [`Self::sender`].
    pub login_with_default: bool,
    /// Desired "send for free" mode.
    pub free_send: FreeMode,
    /// Free-send value this client last successfully applied remotely.
    pub last_applied: FreeMode,
    /// Surface a notification after a fully successful send.
    pub notify_on_send: bool,
}

impl Default for ConnectorPrefs {
    fn default() -> Self {
        Self {
            enabled: false,
            password: String::new(),
            sender: None,
            login_with_default: false,
            free_send: FreeMode::Unset,
            last_applied: FreeMode::Unset,
            notify_on_send: true,
        }
    }
}

/// Persistence seam for the fields the core writes back.
pub trait PrefsStore {
    fn set_password(&mut self, value: &str);
    fn set_last_applied(&mut self, value: FreeMode);
}

#[derive(Debug, Clone, Default)]
/// In-memory [`PrefsStore`], also the snapshot source for hosts without
/// their own preference mechanism.
pub struct MemoryPrefsStore {
    pub prefs: ConnectorPrefs,
}

impl PrefsStore for MemoryPrefsStore {
    fn set_password(&mut self, value: &str) {
        self.prefs.password = value.to_owned();
    }

    fn set_last_applied(&mut self, value: FreeMode) {
        self.prefs.last_applied = value;
    }
}

/// Persist a password change, truncating to [`Password::MAX_LENGTH`].
///
/// Returns true when the value was truncated; the host must then show its
/// truncation warning. One `warn!` event is emitted per truncating change.
pub fn store_password(store: &mut dyn PrefsStore, value: &str) -> bool {
    if value.chars().count() > Password::MAX_LENGTH {
        let truncated: String = value.chars().take(Password::MAX_LENGTH).collect();
        warn!(
            max = Password::MAX_LENGTH,
            "password exceeds the portal limit; stored value was truncated"
        );
        store.set_password(&truncated);
        true
    } else {
        store.set_password(value);
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Result of a fully successful send.
pub struct SendReceipt {
    /// What the portal said the send cost.
    pub cost: Cost,
    /// Balance probed after the send, when the probe matched.
    pub balance: Option<Money>,
    /// Whether the host should surface its success notification.
    pub notify: bool,
}

/// Gateway-facing connector: wires the client's session, send, and
/// settings flows to a preference snapshot and its persistence seam.
pub struct Connector {
    client: FishtextClient,
}

impl Connector {
    pub fn new(client: FishtextClient) -> Self {
        Self { client }
    }

    /// Capability descriptor for the host's registry.
    pub fn spec() -> ConnectorSpec {
        ConnectorSpec {
            name: "Fishtext",
            supports_update: true,
            supports_send: true,
            supports_prefs: true,
            sub_connectors: vec![SubConnector {
                id: "fishtext",
                multi_recipient: true,
            }],
            max_message_length: MessageText::MAX_LENGTH,
        }
    }

    /// Readiness derived from the stored preferences.
    pub fn status(prefs: &ConnectorPrefs) -> ConnectorStatus {
        if !prefs.enabled {
            ConnectorStatus::Inactive
        } else if prefs.password.is_empty() {
            ConnectorStatus::Enabled
        } else {
            ConnectorStatus::Ready
        }
    }

    /// Refresh the session and balance.
    ///
    /// Returns the probed balance for the host to display.
    pub async fn update(
        &self,
        prefs: &ConnectorPrefs,
        command: &UpdateCommand,
    ) -> Result<Option<Money>, FishtextError> {
        let (login, password) = credentials(prefs, &command.default_sender)?;
        self.client.ensure_logged_in(&login, &password, true).await
    }

    /// Send a message.
    ///
    /// Ensures a live session, reconciles the free-send setting (silently),
    /// submits the send, and probes the balance afterwards best-effort.
    pub async fn send(
        &self,
        prefs: &ConnectorPrefs,
        command: &SendCommand,
        store: &mut dyn PrefsStore,
    ) -> Result<SendReceipt, FishtextError> {
        let text = MessageText::new(command.text.clone())?;
        let recipients =
            PreparedRecipients::prepare(&command.recipients, &command.default_prefix)?;
        let (login, password) = credentials(prefs, &command.default_sender)?;

        self.client
            .ensure_logged_in(&login, &password, false)
            .await?;
        self.sync_free_mode(prefs, store).await;

        let send_type = prefs.free_send.send_type().unwrap_or(SendType::Paid);
        let cost = self.client.send(&text, &recipients, send_type).await?;
        let balance = self.client.check_balance().await.balance;

        Ok(SendReceipt {
            cost,
            balance,
            notify: prefs.notify_on_send,
        })
    }

    /// Reconcile the free-send preference against the remote setting.
    ///
    /// Runs only when the desired value differs from the last value this
    /// client successfully applied. Failures never surface: the marker is
    /// reset so the next call retries from scratch. Requires a live
    /// session.
    pub async fn sync_free_mode(&self, prefs: &ConnectorPrefs, store: &mut dyn PrefsStore) {
        let Some(send_type) = prefs.free_send.send_type() else {
            store.set_last_applied(FreeMode::Unset);
            return;
        };

        if prefs.free_send == prefs.last_applied {
            debug!("free-send mode already applied; nothing to sync");
            return;
        }

        match self.client.sync_send_type(send_type).await {
            Ok(()) => store.set_last_applied(prefs.free_send),
            Err(err) => {
                warn!(error = %err, "free-send sync failed; will retry on the next send");
                store.set_last_applied(FreeMode::Unset);
            }
        }
    }
}

/// Pick the login identity: the host's default sender when configured to,
/// otherwise the stored sender falling back to the default.
fn credentials(
    prefs: &ConnectorPrefs,
    default_sender: &str,
) -> Result<(LoginId, Password), FishtextError> {
    let sender = if prefs.login_with_default {
        default_sender
    } else {
        prefs.sender.as_deref().unwrap_or(default_sender)
    };
    let login = LoginId::new(sender)?;
    let password = Password::new(prefs.password.clone())?;
    Ok((login, password))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::fake::FakeTransport;

    const SEND_PAGE: &str = r#"<textarea class="messagelargeinput" name="fLd42" id="message">"#;
    const SETTINGS_PAGE_PAID: &str = r#"
        <input value="Ada" name="firstName">
        <input value="Lovelace" name="lastName">
        <input value="ada@example.com" name="emailAddress">
        <select id="sendType"><option value="1" selected>Paid</option></select>
        <select id="sendFrom"><option value="447123456789" selected>me</option></select>
    "#;

    fn connector(transport: &FakeTransport) -> Connector {
        Connector::new(FishtextClient::with_transport(Arc::new(transport.clone())))
    }

    fn ready_prefs() -> ConnectorPrefs {
        ConnectorPrefs {
            enabled: true,
            password: "secret".to_owned(),
            ..ConnectorPrefs::default()
        }
    }

    fn send_command() -> SendCommand {
        SendCommand {
            recipients: vec!["+447123456789".to_owned()],
            text: "hello".to_owned(),
            default_sender: "+447000000000".to_owned(),
            default_prefix: "+44".to_owned(),
        }
    }

    #[test]
    fn spec_describes_the_connector() {
        let spec = Connector::spec();
        assert_eq!(spec.name, "Fishtext");
        assert!(spec.supports_update && spec.supports_send && spec.supports_prefs);
        assert_eq!(spec.max_message_length, 459);
        assert_eq!(spec.sub_connectors.len(), 1);
        assert!(spec.sub_connectors[0].multi_recipient);
    }

    #[test]
    fn status_follows_the_preference_state() {
        let mut prefs = ConnectorPrefs::default();
        assert_eq!(Connector::status(&prefs), ConnectorStatus::Inactive);

        prefs.enabled = true;
        assert_eq!(Connector::status(&prefs), ConnectorStatus::Enabled);

        prefs.password = "secret".to_owned();
        assert_eq!(Connector::status(&prefs), ConnectorStatus::Ready);
    }

    #[test]
    fn store_password_truncates_and_signals_once() {
        let mut store = MemoryPrefsStore::default();

        assert!(!store_password(&mut store, "short"));
        assert_eq!(store.prefs.password, "short");

        assert!(store_password(&mut store, "averylongpassword"));
        assert_eq!(store.prefs.password, "averylongpas");
        assert_eq!(store.prefs.password.chars().count(), Password::MAX_LENGTH);
    }

    #[tokio::test]
    async fn update_refreshes_the_balance() {
        let transport = FakeTransport::new();
        transport.push_response("<html>Please log in</html>");
        transport.push_response("Welcome back");
        transport.push_response("&pound;7.50");
        let connector = connector(&transport);

        let command = UpdateCommand {
            default_sender: "+447000000000".to_owned(),
            default_prefix: "+44".to_owned(),
        };
        let balance = connector.update(&ready_prefs(), &command).await.unwrap();
        assert_eq!(balance.map(|m| m.to_string()), Some("£7.50".to_owned()));
    }

    #[tokio::test]
    async fn update_with_stored_sender_logs_in_with_it() {
        let transport = FakeTransport::new();
        transport.push_response("<html>Please log in</html>");
        transport.push_response("Welcome back");
        transport.push_response("&pound;7.50");
        let connector = connector(&transport);

        let mut prefs = ready_prefs();
        prefs.sender = Some("+447999999999".to_owned());
        let command = UpdateCommand {
            default_sender: "+447000000000".to_owned(),
            default_prefix: "+44".to_owned(),
        };
        connector.update(&prefs, &command).await.unwrap();

        let requests = transport.requests();
        assert!(
            requests[1]
                .form
                .contains(&("mobile".to_owned(), "447999999999".to_owned()))
        );
    }

    #[tokio::test]
    async fn send_returns_a_receipt_with_the_post_send_balance() {
        let transport = FakeTransport::new();
        transport.push_response("&pound;5.00"); // session probe
        transport.push_response(SEND_PAGE);
        transport.push_response(
            "Message sent. Your message was successfully sent to all recipients at a cost of &pound;0.05.",
        );
        transport.push_response("&pound;4.95"); // post-send probe
        let connector = connector(&transport);

        let mut store = MemoryPrefsStore::default();
        let receipt = connector
            .send(&ready_prefs(), &send_command(), &mut store)
            .await
            .unwrap();

        assert_eq!(receipt.cost.to_string(), "£0.05");
        assert_eq!(receipt.balance.map(|m| m.to_string()), Some("£4.95".to_owned()));
        assert!(receipt.notify);
    }

    #[tokio::test]
    async fn send_survives_a_failed_post_send_probe() {
        let transport = FakeTransport::new();
        transport.push_response("&pound;5.00");
        transport.push_response(SEND_PAGE);
        transport.push_response("Message sent, sent to all recipients, sent free.");
        transport.push_error("timed out");
        let connector = connector(&transport);

        let mut store = MemoryPrefsStore::default();
        let receipt = connector
            .send(&ready_prefs(), &send_command(), &mut store)
            .await
            .unwrap();
        assert_eq!(receipt.cost, Cost::Free);
        assert_eq!(receipt.balance, None);
    }

    #[tokio::test]
    async fn send_rejects_an_overlong_message_before_any_request() {
        let transport = FakeTransport::new();
        let connector = connector(&transport);

        let mut command = send_command();
        command.text = "x".repeat(MessageText::MAX_LENGTH + 1);
        let mut store = MemoryPrefsStore::default();
        let err = connector
            .send(&ready_prefs(), &command, &mut store)
            .await
            .unwrap_err();
        assert!(matches!(err, FishtextError::Validation(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn send_applies_the_free_send_preference_to_the_form() {
        let transport = FakeTransport::new();
        transport.push_response("&pound;5.00");
        transport.push_response(SEND_PAGE);
        transport.push_response("Message sent, sent to all recipients, sent free.");
        transport.push_response("&pound;5.00");
        let connector = connector(&transport);

        let mut prefs = ready_prefs();
        prefs.free_send = FreeMode::Free;
        prefs.last_applied = FreeMode::Free; // already synced, no settings call
        let mut store = MemoryPrefsStore::default();
        connector
            .send(&prefs, &send_command(), &mut store)
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert!(
            requests[2]
                .form
                .contains(&("ST".to_owned(), "0".to_owned()))
        );
    }

    #[tokio::test]
    async fn sync_free_mode_unset_records_the_marker_without_network() {
        let transport = FakeTransport::new();
        let connector = connector(&transport);

        let mut store = MemoryPrefsStore::default();
        store.prefs.last_applied = FreeMode::Free;
        let prefs = ConnectorPrefs {
            free_send: FreeMode::Unset,
            last_applied: FreeMode::Free,
            ..ready_prefs()
        };
        connector.sync_free_mode(&prefs, &mut store).await;

        assert_eq!(store.prefs.last_applied, FreeMode::Unset);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn sync_free_mode_is_idempotent_via_the_marker() {
        let transport = FakeTransport::new();
        transport.push_response(SETTINGS_PAGE_PAID);
        transport.push_response("Your details have been updated");
        let connector = connector(&transport);

        let mut store = MemoryPrefsStore::default();
        store.prefs = ConnectorPrefs {
            free_send: FreeMode::Free,
            ..ready_prefs()
        };

        let prefs = store.prefs.clone();
        connector.sync_free_mode(&prefs, &mut store).await;
        assert_eq!(store.prefs.last_applied, FreeMode::Free);
        assert_eq!(transport.request_count(), 2);

        // Second call with the updated snapshot stays off the network.
        let prefs = store.prefs.clone();
        connector.sync_free_mode(&prefs, &mut store).await;
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn sync_free_mode_resets_the_marker_on_failure() {
        let transport = FakeTransport::new();
        transport.push_error("connection reset");
        let connector = connector(&transport);

        let mut store = MemoryPrefsStore::default();
        let prefs = ConnectorPrefs {
            free_send: FreeMode::Paid,
            last_applied: FreeMode::Free,
            ..ready_prefs()
        };
        connector.sync_free_mode(&prefs, &mut store).await;

        assert_eq!(store.prefs.last_applied, FreeMode::Unset);
    }

    #[tokio::test]
    async fn sync_free_mode_skips_the_write_when_remote_already_matches() {
        let transport = FakeTransport::new();
        transport.push_response(SETTINGS_PAGE_PAID);
        let connector = connector(&transport);

        let mut store = MemoryPrefsStore::default();
        let prefs = ConnectorPrefs {
            free_send: FreeMode::Paid,
            last_applied: FreeMode::Unset,
            ..ready_prefs()
        };
        connector.sync_free_mode(&prefs, &mut store).await;

        assert_eq!(store.prefs.last_applied, FreeMode::Paid);
        assert_eq!(transport.request_count(), 1);
    }
}
