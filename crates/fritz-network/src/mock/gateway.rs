//! In-memory FRITZ!Box simulation.
//!
//! Implements the login endpoint (challenge, response check, session check,
//! logout) and the home-automation endpoint with per-command canned answers.
//! Sessions can be expired on demand to exercise the 403 path.

use crate::mock::scripted::session_info_xml;
use crate::transport::{HttpResponse, Transport, TransportError, target_path};
use fritz_core::SessionId;
use fritz_core::constants::{
    HOME_AUTO_PATH, LOGIN_PATH, PARAM_LOGOUT, PARAM_RESPONSE, PARAM_SID, PARAM_SWITCHCMD,
    PARAM_USERNAME,
};
use fritz_protocol::{Challenge, SwitchCommand};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Cheap iterated challenge so tests do not burn CPU on PBKDF2.
const DEFAULT_CHALLENGE: &str = "2$10$5A1711$5$5A1722";

/// First session identifier handed out.
const FIRST_SESSION: u64 = 0xaffe_1234_affe_1234;

/// Simulated gateway.
///
/// # Examples
///
/// ```
/// use fritz_network::mock::MockGateway;
/// use fritz_network::{ClientConfig, FritzClient};
/// use fritz_core::Credentials;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let gateway = Arc::new(MockGateway::new("fritz3141", "secret"));
/// let config = ClientConfig {
///     credentials: Credentials::new("fritz3141", "secret").unwrap(),
///     ..ClientConfig::default()
/// };
/// let client = FritzClient::with_transport(Arc::clone(&gateway), config);
///
/// client.login().await.unwrap();
/// assert_eq!(gateway.login_attempts(), 1);
/// # }
/// ```
#[derive(Debug)]
pub struct MockGateway {
    state: Mutex<GatewayState>,
    latency: Option<Duration>,
    offline: AtomicBool,

    requests: AtomicUsize,
    challenge_requests: AtomicUsize,
    login_attempts: AtomicUsize,
    session_checks: AtomicUsize,
    logouts: AtomicUsize,
    home_auto_requests: AtomicUsize,
}

#[derive(Debug)]
struct GatewayState {
    username: String,
    password: String,
    challenge: String,
    active: Option<SessionId>,
    next_session: u64,
    block_time: u32,
    reject_logins: bool,
    open_access: bool,
    forbid_commands: bool,
    ignore_logout: bool,
    responses: HashMap<String, (u16, String)>,
    commands: Vec<String>,
}

impl MockGateway {
    /// Gateway with one account and an iterated challenge.
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            state: Mutex::new(GatewayState {
                username: username.to_string(),
                password: password.to_string(),
                challenge: DEFAULT_CHALLENGE.to_string(),
                active: None,
                next_session: FIRST_SESSION,
                block_time: 0,
                reject_logins: false,
                open_access: false,
                forbid_commands: false,
                ignore_logout: false,
                responses: HashMap::new(),
                commands: Vec::new(),
            }),
            latency: None,
            offline: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            challenge_requests: AtomicUsize::new(0),
            login_attempts: AtomicUsize::new(0),
            session_checks: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
            home_auto_requests: AtomicUsize::new(0),
        }
    }

    /// Use `challenge` for every login (legacy or iterated).
    #[must_use]
    pub fn with_challenge(self, challenge: &str) -> Self {
        self.state().challenge = challenge.to_string();
        self
    }

    /// Delay every answer by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Grant sessions without credentials, like a LAN without password.
    #[must_use]
    pub fn with_open_access(self) -> Self {
        self.state().open_access = true;
        self
    }

    /// Canned answer for a home-automation command.
    pub fn set_response(&self, command: SwitchCommand, status: u16, body: &str) {
        self.state()
            .responses
            .insert(command.as_str().to_string(), (status, body.to_string()));
    }

    /// Reject every login with `block_time`.
    pub fn reject_logins(&self, block_time: u32) {
        let mut state = self.state();
        state.reject_logins = true;
        state.block_time = block_time;
    }

    /// Answer 403 to every home-automation command, even with a valid SID.
    pub fn forbid_commands(&self) {
        self.state().forbid_commands = true;
    }

    /// Keep sessions alive on logout requests.
    pub fn ignore_logout(&self) {
        self.state().ignore_logout = true;
    }

    /// Fail every request with a connection error while `offline`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Drop the active session, as after ten idle minutes.
    pub fn expire_session(&self) {
        self.state().active = None;
    }

    /// Currently active session on the gateway side.
    pub fn active_session(&self) -> Option<SessionId> {
        self.state().active
    }

    /// `switchcmd` values received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Every request received.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Anonymous challenge requests (handshake starts).
    pub fn challenge_requests(&self) -> usize {
        self.challenge_requests.load(Ordering::SeqCst)
    }

    /// Submitted challenge responses.
    pub fn login_attempts(&self) -> usize {
        self.login_attempts.load(Ordering::SeqCst)
    }

    pub fn session_checks(&self) -> usize {
        self.session_checks.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn home_auto_requests(&self) -> usize {
        self.home_auto_requests.load(Ordering::SeqCst)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, target: &str) -> HttpResponse {
        let query = target.split_once('?').map_or("", |(_, query)| query);
        let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        match target_path(target) {
            LOGIN_PATH => self.handle_login(&params),
            HOME_AUTO_PATH => self.handle_home_auto(&params),
            _ => HttpResponse::new(404, "Not Found"),
        }
    }

    fn handle_login(&self, params: &HashMap<String, String>) -> HttpResponse {
        let mut state = self.state();
        let sid = params.get(PARAM_SID).and_then(|s| SessionId::new(s).ok());

        if params.get(PARAM_LOGOUT).is_some_and(|v| v == "1") {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            if !state.ignore_logout && sid.is_some() && state.active == sid {
                state.active = None;
            }
            let current = state.active.filter(|active| Some(*active) == sid);
            return state.info(current);
        }

        if let Some(response) = params.get(PARAM_RESPONSE) {
            self.login_attempts.fetch_add(1, Ordering::SeqCst);
            let username = params.get(PARAM_USERNAME).map_or("", String::as_str);

            if !state.reject_logins && state.accepts(username, response) {
                let sid = state.open_session();
                return state.info(Some(sid));
            }
            return state.info(None);
        }

        if let Some(sid) = sid {
            self.session_checks.fetch_add(1, Ordering::SeqCst);
            let current = state.active.filter(|active| *active == sid);
            return state.info(current);
        }

        self.challenge_requests.fetch_add(1, Ordering::SeqCst);
        if state.open_access {
            let sid = state.open_session();
            return state.info(Some(sid));
        }
        state.info(None)
    }

    fn handle_home_auto(&self, params: &HashMap<String, String>) -> HttpResponse {
        self.home_auto_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();

        let command = params.get(PARAM_SWITCHCMD).cloned().unwrap_or_default();
        state.commands.push(command.clone());

        let sid = params.get(PARAM_SID).and_then(|s| SessionId::new(s).ok());
        if state.forbid_commands || sid.is_none() || state.active != sid {
            return HttpResponse::new(403, "Forbidden");
        }

        if let Some((status, body)) = state.responses.get(&command) {
            return HttpResponse::new(*status, body.clone());
        }

        match command.parse::<SwitchCommand>() {
            Ok(SwitchCommand::GetSwitchList) => HttpResponse::ok("087610000434,087610000435\n"),
            Ok(cmd) if cmd.returns_xml() => {
                HttpResponse::ok("<devicelist version=\"1\"></devicelist>")
            }
            Ok(_) => HttpResponse::ok("1\n"),
            Err(_) => HttpResponse::new(400, "Bad Request"),
        }
    }
}

impl GatewayState {
    fn accepts(&self, username: &str, response: &str) -> bool {
        if username != self.username {
            return false;
        }
        Challenge::parse(&self.challenge)
            .and_then(|challenge| challenge.solve(&self.password))
            .is_ok_and(|expected| expected == response)
    }

    fn open_session(&mut self) -> SessionId {
        let sid = SessionId::new(&format!("{:016x}", self.next_session)).unwrap_or_default();
        self.next_session = self.next_session.wrapping_add(1);
        self.active = Some(sid);
        sid
    }

    fn info(&self, sid: Option<SessionId>) -> HttpResponse {
        let sid = sid.unwrap_or(SessionId::INVALID);
        let block_time = if sid.is_valid() { 0 } else { self.block_time };
        let mut xml = session_info_xml(sid.as_str(), &self.challenge, block_time);

        if !self.username.is_empty() {
            xml = xml.replace(
                "</SessionInfo>",
                &format!("<Users><User last=\"1\">{}</User></Users></SessionInfo>", self.username),
            );
        }
        HttpResponse::ok(xml)
    }
}

impl Transport for MockGateway {
    async fn get(&self, target: &str) -> Result<HttpResponse, TransportError> {
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("gateway offline".to_string()));
        }
        Ok(self.handle(target))
    }
}
