pub mod challenge;
pub mod commands;
pub mod request;
pub mod session_info;
pub mod xml;

pub use challenge::{Challenge, IteratedChallenge, solve_iterated, solve_legacy};
pub use commands::SwitchCommand;
pub use request::{GatewayRequest, RequestBuilder};
pub use session_info::{GatewayUser, Right, SessionInfo};
pub use xml::{XmlDocument, XmlElement};
