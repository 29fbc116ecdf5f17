//! Decoding of the `SessionInfo` document returned by `login_sid.lua`.
//!
//! ```text
//! <SessionInfo>
//!   <SID>0000000000000000</SID>
//!   <Challenge>2$60000$...$6000$...</Challenge>
//!   <BlockTime>0</BlockTime>
//!   <Users><User last="1">fritz3141</User></Users>
//!   <Rights><Name>Dial</Name><Access>2</Access>...</Rights>
//! </SessionInfo>
//! ```
//!
//! `SID` and `Challenge` are mandatory; everything else is optional and
//! defaults to empty.

use crate::challenge::Challenge;
use crate::xml::XmlDocument;
use fritz_core::{Error, Result, SessionId};

/// Decoded login endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session identifier (all-zero when not logged in).
    pub sid: SessionId,

    /// Raw challenge string for the next login attempt.
    pub challenge: String,

    /// Seconds the gateway refuses further login attempts.
    pub block_time: u32,

    /// Accounts known to the gateway.
    pub users: Vec<GatewayUser>,

    /// Rights granted to the current session.
    pub rights: Vec<Right>,
}

/// Entry of the `<Users>` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayUser {
    pub name: String,
    /// Marked with `last="1"`: the account used by the last login.
    pub last: bool,
}

/// `(Name, Access)` pair from the `<Rights>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Right {
    pub name: String,
    /// 1 = read, 2 = read/write.
    pub access: u8,
}

impl SessionInfo {
    /// Decode a `SessionInfo` document.
    ///
    /// # Errors
    /// - `Error::Xml` if the body is not well-formed XML
    /// - `Error::MissingElement` if `SID` or `Challenge` is absent
    /// - `Error::InvalidSessionId` if `SID` is not 16 lowercase hex chars
    /// - `Error::InvalidFormat` if `BlockTime` or an access level is not a number
    pub fn parse(body: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse_bytes(body)?;
        Self::from_document(&doc)
    }

    /// Decode from an already parsed document.
    ///
    /// # Errors
    /// See [`SessionInfo::parse`].
    pub fn from_document(doc: &XmlDocument) -> Result<Self> {
        let sid = doc
            .text_of("SID")
            .ok_or_else(|| Error::MissingElement("SID".to_string()))?;
        let sid = SessionId::new(sid)?;

        let challenge = doc
            .text_of("Challenge")
            .ok_or_else(|| Error::MissingElement("Challenge".to_string()))?
            .to_string();

        let block_time = match doc.text_of("BlockTime") {
            Some(value) if !value.is_empty() => value
                .parse()
                .map_err(|_| Error::InvalidFormat(format!("BlockTime {value:?}")))?,
            _ => 0,
        };

        let users = doc
            .find_all("User")
            .into_iter()
            .map(|user| GatewayUser {
                name: user.text().to_string(),
                last: user.attribute("last") == Some("1"),
            })
            .collect();

        Ok(SessionInfo {
            sid,
            challenge,
            block_time,
            users,
            rights: parse_rights(doc)?,
        })
    }

    /// Returns `true` if the gateway reports an authenticated session.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.sid.is_valid()
    }

    /// Decode the challenge into its variant.
    ///
    /// # Errors
    /// See [`Challenge::parse`].
    pub fn parse_challenge(&self) -> Result<Challenge> {
        Challenge::parse(&self.challenge)
    }

    /// Account the gateway marked as last logged in.
    #[must_use]
    pub fn last_user(&self) -> Option<&str> {
        self.users
            .iter()
            .find(|user| user.last)
            .map(|user| user.name.as_str())
    }
}

/// `<Rights>` lists `Name`/`Access` siblings in pairs.
fn parse_rights(doc: &XmlDocument) -> Result<Vec<Right>> {
    let Some(rights) = doc.find("Rights") else {
        return Ok(Vec::new());
    };

    let mut parsed = Vec::new();
    let mut pending_name: Option<&str> = None;

    for child in rights.children() {
        match child.name() {
            "Name" => pending_name = Some(child.text()),
            "Access" => {
                if let Some(name) = pending_name.take() {
                    let access = child.text().parse().map_err(|_| {
                        Error::InvalidFormat(format!("access level {:?}", child.text()))
                    })?;
                    parsed.push(Right {
                        name: name.to_string(),
                        access,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(parsed)
}
