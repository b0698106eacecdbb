//! Client layer: orchestrates the portal's login/send/settings flows over
//! an injectable HTTP transport with a cookie session.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use tracing::debug;
use url::Url;

use crate::domain::{
    BalanceProbe, Cost, LoginId, MessageText, Money, Password, PreparedRecipients, SendOutcome,
    SendType, SessionState, ValidationError,
};

const DEFAULT_BASE_URL: &str = "https://www.fishtext.com";
const LOGIN_PATH: &str = "/cgi-bin/mobi/account";
const BALANCE_PATH: &str = "/cgi-bin/mobi/getBalance.cgi";
const SEND_PAGE_PATH: &str = "/cgi-bin/mobi/sendMessage.cgi";
const SEND_PATH: &str = "/SendSMS/SendSMS";
const SETTINGS_PATH: &str = "/cgi-bin/ajax/settings.cgi";

/// The portal serves different markup to unrecognized browsers, so every
/// request identifies as a fixed desktop browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows; U; Windows NT 5.1; ko; rv:1.9.2.3) \
                              Gecko/20100401 Firefox/3.6.3 (.NET CLR 3.5.30729)";

/// Fallback charset for response bodies that do not declare one.
pub const RESPONSE_ENCODING: &str = "ISO-8859-15";

type BoxError = Box<dyn StdError + Send + Sync>;
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub(crate) trait HttpTransport: Send + Sync {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, BoxError>>;

    fn post_form<'a>(
        &'a self,
        url: &'a str,
        referrer: Option<&'a str>,
        form: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<String, BoxError>>;

    /// Drop all session cookies.
    fn clear_session(&self);
}

/// Cookie jar that can be emptied in place, for the login flow's
/// clear-before-attempt and clear-after-rejection steps.
#[derive(Debug, Default)]
struct SessionJar {
    inner: RwLock<Jar>,
}

impl SessionJar {
    fn clear(&self) {
        *self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Jar::default();
    }
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cookies(url)
    }
}

#[derive(Debug)]
struct ReqwestTransport {
    client: reqwest::Client,
    jar: Arc<SessionJar>,
}

impl ReqwestTransport {
    fn new(timeout: Option<Duration>, user_agent: &str) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(SessionJar::default());
        let mut builder = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            jar,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, BoxError>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await?.error_for_status()?;
            let body = response.text_with_charset(RESPONSE_ENCODING).await?;
            Ok(body)
        })
    }

    fn post_form<'a>(
        &'a self,
        url: &'a str,
        referrer: Option<&'a str>,
        form: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<String, BoxError>> {
        Box::pin(async move {
            let mut request = self.client.post(url).form(&form);
            if let Some(referrer) = referrer {
                request = request.header(reqwest::header::REFERER, referrer);
            }
            let response = request.send().await?.error_for_status()?;
            let body = response.text_with_charset(RESPONSE_ENCODING).await?;
            Ok(body)
        })
    }

    fn clear_session(&self) {
        self.jar.clear();
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`FishtextClient`] and [`crate::connector::Connector`].
///
/// Balance-probe failures never surface here; the probe reports
/// [`SessionState::LoggedOut`] instead.
pub enum FishtextError {
    /// The configured base URL could not be parsed or joined.
    #[error("invalid portal URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client / transport failure (DNS, TLS, timeouts, non-2xx).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The login response did not contain the welcome marker. The session
    /// cookies have been cleared.
    #[error("the portal rejected the login credentials")]
    BadCredentials,

    /// The send page did not contain the per-session message field,
    /// meaning the markup changed or the session is invalid in a way the
    /// balance probe did not catch.
    #[error("send page did not contain the message form field")]
    MessageFieldNotFound,

    /// The portal refused the send outright.
    #[error("send rejected by the portal: {reason}")]
    Rejected { reason: String },

    /// The message reached some recipients; the rest were skipped as
    /// invalid and are listed in the caller's original format.
    #[error("message reached {sent} recipient(s) at cost {cost}; undelivered: {}", .failed.join(", "))]
    PartialDelivery {
        sent: usize,
        cost: Cost,
        failed: Vec<String>,
    },

    /// The message reached none of the recipients.
    #[error("message reached none of the {total} recipient(s); undelivered: {}", .failed.join(", "))]
    NoDelivery { total: usize, failed: Vec<String> },

    /// The response matched neither the success nor the failure shape.
    #[error("the portal returned an unrecognized response")]
    UnexpectedResponse,

    /// The settings POST was not confirmed by the portal.
    #[error("settings update was not confirmed by the portal")]
    SettingsNotSaved,

    /// One of the domain constructors rejected an invalid value.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone)]
/// Builder for [`FishtextClient`].
///
/// Use this to point the client at a test server or to override the
/// timeout or user-agent.
pub struct FishtextClientBuilder {
    base_url: String,
    timeout: Option<Duration>,
    user_agent: String,
}

impl FishtextClientBuilder {
    /// Create a builder with the production portal URL and default
    /// user-agent, and no timeout.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: None,
            user_agent: USER_AGENT.to_owned(),
        }
    }

    /// Override the portal base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set an HTTP client timeout applied to each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build a [`FishtextClient`].
    pub fn build(self) -> Result<FishtextClient, FishtextError> {
        let base: Url = self.base_url.parse()?;
        let transport = ReqwestTransport::new(self.timeout, &self.user_agent)
            .map_err(|err| FishtextError::Transport(Box::new(err)))?;
        FishtextClient::from_parts(&base, Arc::new(transport))
    }
}

impl Default for FishtextClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
/// Client for the Fishtext mobile web portal.
///
/// The portal has no structured API: the session lives in cookies, login
/// state is inferred by probing the balance endpoint, and every response
/// is classified by pattern matching. This type orchestrates those flows;
/// the patterns themselves live in the transport layer.
pub struct FishtextClient {
    login_url: Url,
    balance_url: Url,
    send_page_url: Url,
    send_url: Url,
    settings_url: Url,
    http: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for FishtextClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FishtextClient")
            .field("login_url", &self.login_url)
            .field("balance_url", &self.balance_url)
            .field("send_page_url", &self.send_page_url)
            .field("send_url", &self.send_url)
            .field("settings_url", &self.settings_url)
            .field("http", &"<dyn HttpTransport>")
            .finish()
    }
}

impl FishtextClient {
    /// Create a client against the production portal.
    ///
    /// For more customization, use [`FishtextClient::builder`].
    pub fn new() -> Result<Self, FishtextError> {
        Self::builder().build()
    }

    /// Start building a client with custom settings.
    pub fn builder() -> FishtextClientBuilder {
        FishtextClientBuilder::new()
    }

    fn from_parts(base: &Url, http: Arc<dyn HttpTransport>) -> Result<Self, FishtextError> {
        Ok(Self {
            login_url: base.join(LOGIN_PATH)?,
            balance_url: base.join(BALANCE_PATH)?,
            send_page_url: base.join(SEND_PAGE_PATH)?,
            send_url: base.join(SEND_PATH)?,
            settings_url: base.join(SETTINGS_PATH)?,
            http,
        })
    }

    /// Probe the balance endpoint to learn whether the session is live.
    ///
    /// Never fails: a transport error or an unmatched body both mean
    /// [`SessionState::LoggedOut`]. The error is logged and swallowed.
    pub async fn check_balance(&self) -> BalanceProbe {
        let body = match self.http.get(self.balance_url.as_str()).await {
            Ok(body) => body,
            Err(err) => {
                debug!(error = %err, "balance probe request failed");
                return BalanceProbe::logged_out();
            }
        };

        match crate::transport::parse_balance(&body) {
            Some(balance) => {
                debug!(balance = %balance, "balance probe matched");
                BalanceProbe {
                    state: SessionState::LoggedIn,
                    balance: Some(balance),
                }
            }
            None => {
                debug!("balance probe did not match; treating session as logged out");
                BalanceProbe::logged_out()
            }
        }
    }

    /// Log in to the portal.
    ///
    /// Clears the cookie session before the attempt so no stale artifacts
    /// leak in, and again after a rejection. The login page is sent as the
    /// referrer of its own POST, which the portal requires.
    pub async fn login(&self, login: &LoginId, password: &Password) -> Result<(), FishtextError> {
        self.http.clear_session();
        debug!(login = login.as_str(), "attempting login");

        let form = crate::transport::encode_login_form(login, password);
        let body = self
            .http
            .post_form(self.login_url.as_str(), Some(self.login_url.as_str()), form)
            .await
            .map_err(FishtextError::Transport)?;

        if !crate::transport::login_succeeded(&body) {
            self.http.clear_session();
            debug!("login rejected; session cleared");
            return Err(FishtextError::BadCredentials);
        }
        Ok(())
    }

    /// Probe the session and log in if needed.
    ///
    /// Returns the latest known balance. With `refresh_balance` set, a
    /// fresh login is followed by a best-effort re-probe whose own failure
    /// is swallowed.
    pub async fn ensure_logged_in(
        &self,
        login: &LoginId,
        password: &Password,
        refresh_balance: bool,
    ) -> Result<Option<Money>, FishtextError> {
        let probe = self.check_balance().await;
        if probe.is_logged_in() {
            return Ok(probe.balance);
        }

        self.login(login, password).await?;
        if refresh_balance {
            Ok(self.check_balance().await.balance)
        } else {
            Ok(None)
        }
    }

    /// Send a message to the prepared recipients.
    ///
    /// Fetches the send page to learn the session's message field name,
    /// submits the form, and classifies the response. Only a confirmed
    /// send to all recipients returns `Ok`; every other classification is
    /// a distinct error. Requires a live session.
    pub async fn send(
        &self,
        text: &MessageText,
        recipients: &PreparedRecipients,
        send_type: SendType,
    ) -> Result<Cost, FishtextError> {
        let page = self
            .http
            .get(self.send_page_url.as_str())
            .await
            .map_err(FishtextError::Transport)?;
        let message_field = crate::transport::extract_message_field(&page)
            .ok_or(FishtextError::MessageFieldNotFound)?;
        debug!(field = %message_field, "resolved per-session message field");

        let form = crate::transport::encode_send_form(&message_field, text, send_type, recipients);
        let body = self
            .http
            .post_form(self.send_url.as_str(), None, form)
            .await
            .map_err(FishtextError::Transport)?;

        match crate::transport::classify_send_response(&body, recipients) {
            SendOutcome::SentToAll { cost } => Ok(cost),
            SendOutcome::SentToSome { sent, cost, failed } => {
                Err(FishtextError::PartialDelivery { sent, cost, failed })
            }
            SendOutcome::SentToNone { total, failed } => {
                Err(FishtextError::NoDelivery { total, failed })
            }
            SendOutcome::Rejected { reason } => Err(FishtextError::Rejected { reason }),
            SendOutcome::Unrecognized => Err(FishtextError::UnexpectedResponse),
        }
    }

    /// Reconcile the account's remote send-type setting with `desired`.
    ///
    /// Scrapes the settings form, and skips the write when the remote
    /// value already matches. Requires a live session.
    pub async fn sync_send_type(&self, desired: SendType) -> Result<(), FishtextError> {
        let page = self
            .http
            .get(self.settings_url.as_str())
            .await
            .map_err(FishtextError::Transport)?;
        let form = crate::transport::parse_settings_form(&page);

        if form.send_type() == Some(desired.flag()) {
            debug!("remote send type already matches; skipping write");
            return Ok(());
        }

        let params = crate::transport::encode_settings_form(&form, desired);
        let body = self
            .http
            .post_form(self.settings_url.as_str(), None, params)
            .await
            .map_err(FishtextError::Transport)?;

        if !crate::transport::settings_saved(&body) {
            return Err(FishtextError::SettingsNotSaved);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn with_transport(http: Arc<dyn HttpTransport>) -> Self {
        let base: Url = DEFAULT_BASE_URL.parse().expect("default base url");
        Self::from_parts(&base, http).expect("default endpoints")
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    use super::{BoxError, BoxFuture, HttpTransport};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub referrer: Option<String>,
        pub form: Vec<(String, String)>,
    }

    #[derive(Debug)]
    struct ScriptedError(String);

    impl fmt::Display for ScriptedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl std::error::Error for ScriptedError {}

    #[derive(Debug, Default)]
    struct State {
        responses: VecDeque<Result<String, String>>,
        requests: Vec<RecordedRequest>,
        sessions_cleared: usize,
    }

    /// Transport double that replays a scripted sequence of response
    /// bodies and records every request and session clear.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeTransport {
        state: Arc<Mutex<State>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn push_response(&self, body: impl Into<String>) {
            self.state
                .lock()
                .unwrap()
                .responses
                .push_back(Ok(body.into()));
        }

        pub(crate) fn push_error(&self, message: impl Into<String>) {
            self.state
                .lock()
                .unwrap()
                .responses
                .push_back(Err(message.into()));
        }

        pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        pub(crate) fn request_count(&self) -> usize {
            self.state.lock().unwrap().requests.len()
        }

        pub(crate) fn sessions_cleared(&self) -> usize {
            self.state.lock().unwrap().sessions_cleared
        }

        fn record(&self, request: RecordedRequest) -> Result<String, BoxError> {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request);
            match state.responses.pop_front() {
                Some(Ok(body)) => Ok(body),
                Some(Err(message)) => Err(Box::new(ScriptedError(message))),
                None => Err(Box::new(ScriptedError("no scripted response".to_owned()))),
            }
        }
    }

    impl HttpTransport for FakeTransport {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, BoxError>> {
            let result = self.record(RecordedRequest {
                method: "GET",
                url: url.to_owned(),
                referrer: None,
                form: Vec::new(),
            });
            Box::pin(async move { result })
        }

        fn post_form<'a>(
            &'a self,
            url: &'a str,
            referrer: Option<&'a str>,
            form: Vec<(String, String)>,
        ) -> BoxFuture<'a, Result<String, BoxError>> {
            let result = self.record(RecordedRequest {
                method: "POST",
                url: url.to_owned(),
                referrer: referrer.map(str::to_owned),
                form,
            });
            Box::pin(async move { result })
        }

        fn clear_session(&self) {
            self.state.lock().unwrap().sessions_cleared += 1;
        }
    }
}
