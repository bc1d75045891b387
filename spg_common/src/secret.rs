//! Gateway credentials (merchant salts, OAuth secrets, the webhook HMAC key) travel through
//! config structs that get logged at startup. `Secret` wraps them so a stray `{:?}` can never
//! leak one into the logs.

use std::fmt;

#[derive(Clone, Default)]
pub struct Secret<T: Clone + Default>(T);

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Hands back the wrapped value. Keep the exposure local: sign or compare, then drop the
    /// reference.
    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl<T: Clone + Default> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: Clone + Default> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_never_leak_through_debug_or_display() {
        let salt = Secret::from("easebuzz-salt-123".to_string());
        assert_eq!(format!("{salt:?}"), "****");
        assert_eq!(format!("{salt}"), "****");
        assert_eq!(salt.reveal(), "easebuzz-salt-123");
    }
}
