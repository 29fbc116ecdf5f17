//! Session-managing HTTPS client for FRITZ!Box gateways.
//!
//! This crate keeps an authenticated session with the gateway's HTTP/XML
//! interface: it performs the challenge/response login, attaches the session
//! identifier to every request, renews the session when the gateway answers
//! 403 and keeps idle sessions alive in the background.
//!
//! # Components
//!
//! - **Transport**: one-shot GET abstraction, [`HttpsTransport`] for real
//!   gateways and [`mock`] doubles for tests
//! - **SessionState**: current SID and last-activity clock
//! - **Authenticator**: login handshake, single-flight re-login, logoff
//! - **RequestExecutor**: SID injection, status handling, one retry after
//!   re-login
//! - **KeepAlive**: background probe before the gateway's idle timeout
//! - **FritzClient**: façade tying everything together
//!
//! # Example
//!
//! ```no_run
//! use fritz_network::{ClientConfig, FritzClient};
//! use fritz_protocol::SwitchCommand;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FritzClient::connect(ClientConfig::from_env()?)?;
//! client.login().await?;
//!
//! let devices = client
//!     .home_auto_xml(SwitchCommand::GetDeviceListInfos, None, &[])
//!     .await?;
//! for device in devices.find_all("device") {
//!     println!("{:?}", device.child_text("name"));
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod error;
mod executor;
mod https;
mod keepalive;
mod session;
mod transport;

pub mod mock;

pub use auth::{Authenticator, LoginOutcome};
pub use client::{ClientConfig, FritzClient};
pub use error::{ClientError, Result};
pub use executor::{GatewayResponse, RequestExecutor, ResponseFormat};
pub use https::{HttpsTransport, TlsPolicy};
pub use keepalive::{KeepAlive, KeepAliveConfig};
pub use session::{SessionSnapshot, SessionState};
pub use transport::{HttpResponse, Transport, TransportError};
