use crate::{
    Result,
    constants::{INVALID_SESSION_ID, MAX_USERNAME_LENGTH, SESSION_ID_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Session identifier (16 lowercase hex characters).
///
/// The all-zero identifier means "no valid session" and is the only legal
/// initial value.
///
/// # Security
/// A valid SID is a bearer token, so comparison is constant-time.
#[derive(Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId([u8; SESSION_ID_LENGTH]);

impl SessionId {
    /// The distinguished "no session" identifier.
    pub const INVALID: SessionId = SessionId([b'0'; SESSION_ID_LENGTH]);

    /// Create a session identifier with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSessionId` unless the input is exactly 16
    /// characters of `[0-9a-f]`.
    pub fn new(sid: &str) -> Result<Self> {
        let bytes = sid.as_bytes();
        if bytes.len() != SESSION_ID_LENGTH {
            return Err(Error::InvalidSessionId(format!(
                "expected {SESSION_ID_LENGTH} characters, got {}",
                bytes.len()
            )));
        }
        if !bytes
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
        {
            return Err(Error::InvalidSessionId(
                "must be lowercase hexadecimal".to_string(),
            ));
        }

        let mut raw = [0u8; SESSION_ID_LENGTH];
        raw.copy_from_slice(bytes);
        Ok(SessionId(raw))
    }

    /// Returns `true` unless this is the all-zero identifier.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only ASCII hex digits are ever stored.
        std::str::from_utf8(&self.0).unwrap_or(INVALID_SESSION_ID)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl std::hash::Hash for SessionId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the validity is printed so that SIDs never end up in logs.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "SessionId(<valid>)")
        } else {
            write!(f, "SessionId(<invalid>)")
        }
    }
}

impl std::str::FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SessionId::new(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        SessionId::new(&value)
    }
}

impl From<SessionId> for String {
    fn from(sid: SessionId) -> Self {
        sid.as_str().to_string()
    }
}

/// FRITZ!OS user name (0-32 characters).
///
/// An empty user name is allowed: the login handshake then uses the account
/// the gateway reports as last logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Create a user name with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidUsername` if the name is longer than 32
    /// characters or contains characters other than `[A-Za-z0-9._@-]`.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();

        let len = name.chars().count();
        if len > MAX_USERNAME_LENGTH {
            return Err(Error::InvalidUsername(format!(
                "must be at most {MAX_USERNAME_LENGTH} chars, got {len}"
            )));
        }

        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-')))
        {
            return Err(Error::InvalidUsername(format!(
                "unsupported character {c:?}"
            )));
        }

        Ok(Username(name.to_string()))
    }

    /// Get the user name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no user name was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Username::new(s)
    }
}

impl TryFrom<String> for Username {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Username::new(&value)
    }
}

impl From<Username> for String {
    fn from(name: Username) -> Self {
        name.0
    }
}

/// Account password.
///
/// Deliberately not serializable and never printed.
#[derive(Clone, Default)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Password(password.into())
    }

    /// Expose the secret for hashing.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for Password {}

/// Login credentials, immutable for the lifetime of a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Username,
    pub password: Password,
}

impl Credentials {
    /// Build credentials from raw strings.
    ///
    /// # Errors
    /// Returns `Error::InvalidUsername` if the user name is invalid.
    pub fn new(username: &str, password: impl Into<String>) -> Result<Self> {
        Ok(Credentials {
            username: Username::new(username)?,
            password: Password::new(password),
        })
    }
}

/// Actor identification number of a smart-home device or group.
///
/// Opaque to the session layer. AVM prints AINs with a space
/// (`08761 0000434`); templates and groups use other shapes, so only the
/// character set is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ain(String);

impl Ain {
    /// Create an AIN with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidAin` if the value is empty after trimming or
    /// contains characters other than `[0-9A-Za-z: -]`.
    pub fn new(ain: &str) -> Result<Self> {
        let ain = ain.trim();

        if ain.is_empty() {
            return Err(Error::InvalidAin("must not be empty".to_string()));
        }

        if !ain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | ' ' | '-'))
        {
            return Err(Error::InvalidAin(format!("unsupported characters in {ain:?}")));
        }

        Ok(Ain(ain.to_string()))
    }

    /// Get the AIN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Ain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ain::new(s)
    }
}

impl TryFrom<String> for Ain {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Ain::new(&value)
    }
}

impl From<Ain> for String {
    fn from(ain: Ain) -> Self {
        ain.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("affe1234affe1234")]
    #[case("0000000000000001")]
    #[case("ffffffffffffffff")]
    #[case("0123456789abcdef")]
    fn test_session_id_valid(#[case] input: &str) {
        let sid: SessionId = input.parse().unwrap();
        assert!(sid.is_valid());
        assert_eq!(sid.as_str(), input);
        assert_eq!(sid.to_string(), input);
    }

    #[test]
    fn test_session_id_zero_is_invalid() {
        let sid = SessionId::new(INVALID_SESSION_ID).unwrap();
        assert!(!sid.is_valid());
        assert_eq!(sid, SessionId::INVALID);
        assert_eq!(SessionId::default(), SessionId::INVALID);
    }

    #[rstest]
    #[case("")] // empty
    #[case("affe1234affe123")] // 15 chars
    #[case("affe1234affe12345")] // 17 chars
    #[case("AFFE1234AFFE1234")] // uppercase
    #[case("affe1234affe123g")] // non-hex
    fn test_session_id_invalid(#[case] input: &str) {
        let result: Result<SessionId> = input.parse();
        assert!(matches!(result, Err(Error::InvalidSessionId(_))));
    }

    #[test]
    fn test_session_id_debug_hides_value() {
        let sid = SessionId::new("affe1234affe1234").unwrap();
        let debug = format!("{sid:?}");
        assert!(!debug.contains("affe"));
        assert_eq!(debug, "SessionId(<valid>)");
    }

    #[test]
    fn test_session_id_serde() {
        let sid = SessionId::new("affe1234affe1234").unwrap();
        let json = serde_json::to_string(&sid).unwrap();
        assert_eq!(json, "\"affe1234affe1234\"");

        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sid);

        assert!(serde_json::from_str::<SessionId>("\"nope\"").is_err());
    }

    #[rstest]
    #[case("", "")]
    #[case("admin", "admin")]
    #[case(" fritz3141 ", "fritz3141")]
    #[case("john.doe@home", "john.doe@home")]
    #[case("abcdefghijklmnopqrstuvwxyz012345", "abcdefghijklmnopqrstuvwxyz012345")]
    fn test_username_valid(#[case] input: &str, #[case] expected: &str) {
        let name = Username::new(input).unwrap();
        assert_eq!(name.as_str(), expected);
    }

    #[rstest]
    #[case("abcdefghijklmnopqrstuvwxyz0123456")] // 33 chars
    #[case("user name")] // space
    #[case("user&name")] // query delimiter
    fn test_username_invalid(#[case] input: &str) {
        assert!(matches!(
            Username::new(input),
            Err(Error::InvalidUsername(_))
        ));
    }

    #[test]
    fn test_password_never_printed() {
        let creds = Credentials::new("admin", "hunter2").unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("admin"));
        assert_eq!(creds.password.expose(), "hunter2");
    }

    #[rstest]
    #[case("087610000434", "087610000434")]
    #[case(" 08761 0000434 ", "08761 0000434")]
    #[case("grp303E4F-3F9A1B", "grp303E4F-3F9A1B")]
    #[case("tmp4A2B3C-39A2F1", "tmp4A2B3C-39A2F1")]
    fn test_ain_valid(#[case] input: &str, #[case] expected: &str) {
        let ain: Ain = input.parse().unwrap();
        assert_eq!(ain.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("0876&switchcmd=x")]
    fn test_ain_invalid(#[case] input: &str) {
        assert!(matches!(Ain::new(input), Err(Error::InvalidAin(_))));
    }
}
