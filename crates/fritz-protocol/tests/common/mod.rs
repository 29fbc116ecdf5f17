//! Common test utilities for protocol integration tests.
//!
//! Builders for `SessionInfo` documents so tests can describe gateway
//! answers in one line instead of hand-writing XML.

#![allow(dead_code)]

/// Logged-out session info carrying `challenge`.
pub fn session_info_xml(sid: &str, challenge: &str, block_time: u32) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <SessionInfo><SID>{sid}</SID><Challenge>{challenge}</Challenge>\
         <BlockTime>{block_time}</BlockTime><Rights></Rights></SessionInfo>"
    )
}

/// Session info listing `users`, the last one marked as last logged in.
pub fn session_info_with_users(sid: &str, challenge: &str, users: &[&str]) -> String {
    let users: String = users
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i + 1 == users.len() {
                format!("<User last=\"1\">{name}</User>")
            } else {
                format!("<User>{name}</User>")
            }
        })
        .collect();

    format!(
        "<SessionInfo><SID>{sid}</SID><Challenge>{challenge}</Challenge>\
         <BlockTime>0</BlockTime><Users>{users}</Users></SessionInfo>"
    )
}

/// Known-answer vector from the AVM login documentation.
pub const AVM_PBKDF2_CHALLENGE: &str = "2$10000$5A1711$2000$5A1722";
pub const AVM_PBKDF2_PASSWORD: &str = "1example!";
pub const AVM_PBKDF2_RESPONSE: &str =
    "5A1722$1798a1672bca7c6463d6b245f82b53703b0f50813401b03e4045a5861e689adb";

pub const AVM_MD5_CHALLENGE: &str = "1234567z";
pub const AVM_MD5_PASSWORD: &str = "äbc";
pub const AVM_MD5_RESPONSE: &str = "1234567z-9e224a41eeefa284df7bb0f26c2913e2";
