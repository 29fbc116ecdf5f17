//! Simulated gateways for testing and development.
//!
//! These transports answer in memory and can be inspected afterwards, so
//! session handling is testable without a FRITZ!Box on the network.

pub mod gateway;
pub mod scripted;

pub use gateway::MockGateway;
pub use scripted::{ScriptedTransport, session_info_xml};
