//! Signatures for values this service puts into URLs it hands to a provider, so a
//! callback endpoint only acts on values the service generated itself.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;

use crate::error::{webhook_error, Error, WebhookErrorKind};

type HmacSha1 = Hmac<Sha1>;

pub struct UrlSigner {
    key: SecretString,
}

impl UrlSigner {
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }

    fn mac_for(&self, value: &str) -> Result<HmacSha1, Error> {
        let mut mac = HmacSha1::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|_| webhook_error(WebhookErrorKind::InvalidPayload, "Invalid HMAC key"))?;
        mac.update(value.as_bytes());
        Ok(mac)
    }

    /// URL-safe, unpadded base64 HMAC-SHA1 of `value`.
    pub fn sign(&self, value: &str) -> Result<String, Error> {
        let mac = self.mac_for(value)?;
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Whether `signature` was produced by [`UrlSigner::sign`] for `value` with this key.
    pub fn verify(&self, value: &str, signature: &str) -> bool {
        let Ok(expected) = URL_SAFE_NO_PAD.decode(signature.trim()) else {
            return false;
        };
        match self.mac_for(value) {
            // verify_slice compares in constant time
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(key: &str) -> UrlSigner {
        UrlSigner::new(SecretString::new(key.to_string()))
    }

    #[test]
    fn test_signature_verifies_for_the_signed_value() {
        let signer = signer("auth-token");
        let signature = signer.sign("See you tomorrow at 2pm").unwrap();

        assert!(signer.verify("See you tomorrow at 2pm", &signature));
        assert!(!signature.contains(['+', '/', '=']));
    }

    #[test]
    fn test_signature_does_not_cover_other_values() {
        let signer = signer("auth-token");
        let signature = signer.sign("See you tomorrow at 2pm").unwrap();

        assert!(!signer.verify("Buy cheap watches", &signature));
    }

    #[test]
    fn test_signature_from_another_key_is_rejected() {
        let signature = signer("other-token").sign("Hello").unwrap();

        assert!(!signer("auth-token").verify("Hello", &signature));
        assert!(!signer("auth-token").verify("Hello", "not base64!"));
    }
}
