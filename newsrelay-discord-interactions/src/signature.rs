//! Ed25519 request signatures.
//!
//! Discord signs `timestamp ++ body` with the application key and sends the
//! hex signature and the timestamp as headers. Unsigned or tampered requests
//! must be answered with 401.

use axum::http::HeaderMap;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::error::InteractionError;

/// Header carrying the hex-encoded signature.
pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
/// Header carrying the signed timestamp.
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Checks request signatures against the application's public key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Build a verifier from the hex public key shown in the developer portal.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidKey`] when the key is not 32 hex-encoded bytes.
    pub fn from_hex(public_key: &str) -> Result<Self, InteractionError> {
        let bytes: [u8; 32] = hex::decode(public_key.trim())
            .map_err(|err| InteractionError::InvalidKey(err.to_string()))?
            .try_into()
            .map_err(|_| InteractionError::InvalidKey("expected 32 bytes".to_owned()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|err| InteractionError::InvalidKey(err.to_string()))?;
        Ok(Self { key })
    }

    /// Build a verifier from an already decoded key.
    #[must_use]
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Verify the signature headers against `body`.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::MissingHeader`] or [`InteractionError::BadSignature`].
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), InteractionError> {
        let signature = header(headers, SIGNATURE_HEADER)?;
        let timestamp = header(headers, TIMESTAMP_HEADER)?;

        let signature: [u8; 64] = hex::decode(signature)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(InteractionError::BadSignature)?;
        let signature = Signature::from_bytes(&signature);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| InteractionError::BadSignature)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, InteractionError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(InteractionError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    fn signed_headers(key: &SigningKey, timestamp: &str, body: &[u8]) -> HeaderMap {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        let signature = key.sign(&message);

        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            hex::encode(signature.to_bytes()).parse().expect("ascii header"),
        );
        headers.insert(TIMESTAMP_HEADER, timestamp.parse().expect("ascii header"));
        headers
    }

    #[test]
    fn accepts_signed_body() {
        let key = SigningKey::from_bytes(&[7; 32]);
        let verifier =
            SignatureVerifier::from_hex(&hex::encode(key.verifying_key().to_bytes())).expect("key");
        let body = br#"{"type":1}"#;

        assert!(verifier.verify(&signed_headers(&key, "1700000000", body), body).is_ok());
    }

    #[test]
    fn rejects_tampered_body_and_foreign_key() {
        let key = SigningKey::from_bytes(&[7; 32]);
        let other = SigningKey::from_bytes(&[9; 32]);
        let verifier = SignatureVerifier::new(key.verifying_key());
        let body = br#"{"type":1}"#;

        let tampered = verifier.verify(&signed_headers(&key, "1700000000", body), br#"{"type":2}"#);
        assert!(matches!(tampered, Err(InteractionError::BadSignature)));

        let foreign = verifier.verify(&signed_headers(&other, "1700000000", body), body);
        assert!(matches!(foreign, Err(InteractionError::BadSignature)));
    }

    #[test]
    fn missing_headers_are_reported() {
        let verifier = SignatureVerifier::new(SigningKey::from_bytes(&[7; 32]).verifying_key());
        let result = verifier.verify(&HeaderMap::new(), b"{}");
        assert!(matches!(
            result,
            Err(InteractionError::MissingHeader(SIGNATURE_HEADER))
        ));
    }

    #[test]
    fn rejects_malformed_public_key() {
        assert!(SignatureVerifier::from_hex("zz").is_err());
        assert!(SignatureVerifier::from_hex("abcd").is_err());
    }
}
