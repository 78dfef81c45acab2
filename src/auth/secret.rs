use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque secret string (access or refresh token).
///
/// `Debug` prints a redaction marker and `Display` is deliberately not
/// implemented, so a token cannot end up in log output or formatted strings
/// by accident. The raw value leaves only through [`SecretString::expose`]
/// (request bodies) or serde (the credential store).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw secret. Call sites are the only places a token value
    /// crosses out of the wrapper.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(..)")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_reveals_the_value() {
        let secret = SecretString::new("atza|raw-token-value");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("raw-token-value"));
        assert_eq!(rendered, "SecretString(..)");
    }

    #[test]
    fn expose_returns_raw_value() {
        let secret = SecretString::new("atza|raw-token-value");
        assert_eq!(secret.expose(), "atza|raw-token-value");
    }

    #[test]
    fn serde_is_transparent_for_persistence() {
        let secret = SecretString::new("tok");
        let serialized = serde_json::to_string(&secret).unwrap();
        assert_eq!(serialized, "\"tok\"");
        let back: SecretString = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back, secret);
    }
}
