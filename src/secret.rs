use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A wrapper that keeps sensitive values out of logs.
///
/// The gateway holds two kinds of secret material: the token signing key,
/// loaded once at startup, and caller passwords, which pass through on their
/// way to the credential service. Both are wrapped in `Secret<T>` so that a
/// stray `tracing::debug!(?payload)` prints `[REDACTED]` instead of the value.
///
/// # Security Properties
///
/// - Does NOT implement `Deref`, `AsRef`, `Borrow`, `Clone`, or `Copy`
/// - Debug and Display output is always `[REDACTED]`
/// - Serialization is transparent so a password can be forwarded unchanged;
///   serialize only into a request body, never into a log line
///
/// # Examples
///
/// ```
/// use mesh_gateway::Secret;
///
/// let password = Secret::new("hunter2".to_string());
/// assert_eq!(format!("{:?}", password), "[REDACTED]");
/// assert_eq!(password.expose_secret(), "hunter2");
/// ```
// Do NOT add Clone, Copy, or Default derives.
pub struct Secret<T> {
    // This field MUST remain private.
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value in a `Secret`.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the secret value.
    ///
    /// The verbose name is intentional: every call site is a place where
    /// secret material leaves the wrapper.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Serialize> Serialize for Secret<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Secret::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_redacts_debug() {
        let password = Secret::new("hunter2".to_string());
        let debug_output = format!("{:?}", password);

        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("String"));
    }

    #[test]
    fn secret_redacts_display() {
        let key = Secret::new(b"signing-key".to_vec());
        assert_eq!(format!("{}", key), "[REDACTED]");
    }

    #[test]
    fn secret_redacts_inside_derived_debug() {
        #[derive(Debug)]
        struct Login {
            email: String,
            password: Secret<String>,
        }

        let login = Login {
            email: "a@example.com".to_string(),
            password: Secret::new("hunter2".to_string()),
        };
        let out = format!("{:?}", login);
        assert!(out.contains("a@example.com"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn secret_serializes_transparently() {
        let password = Secret::new("hunter2".to_string());
        assert_eq!(serde_json::to_string(&password).unwrap(), "\"hunter2\"");

        let back: Secret<String> = serde_json::from_str("\"pw\"").unwrap();
        assert_eq!(back.expose_secret(), "pw");
    }
}
