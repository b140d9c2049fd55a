use crate::error::PaymentError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Verifies gateway checkout callbacks.
///
/// The gateway signs `"{order_id}|{payment_id}"` with the shared key secret
/// using HMAC-SHA256 and sends the hex digest alongside the callback. The
/// verifier recomputes the digest and compares in constant time
/// (`Mac::verify_slice`). Fails closed: malformed input verifies false, and
/// an empty secret is rejected at construction.
pub struct SignatureVerifier {
    secret: Zeroizing<Vec<u8>>,
}

impl SignatureVerifier {
    pub fn new(secret: &str) -> Result<Self, PaymentError> {
        if secret.is_empty() {
            return Err(PaymentError::MisconfiguredCredentials(
                "gateway key secret is empty".to_string(),
            ));
        }
        Ok(Self {
            secret: Zeroizing::new(secret.as_bytes().to_vec()),
        })
    }

    /// Checks the supplied hex signature over `order_id` and `payment_id`.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(supplied) = hex::decode(signature) else {
            return false;
        };

        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac.verify_slice(&supplied).is_ok()
    }
}

/// Computes the hex signature the gateway would send for the given pair.
///
/// Used by test fixtures and by sandbox tooling that stands in for the
/// external gateway.
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_key_secret";

    #[test]
    fn test_valid_signature() {
        let verifier = SignatureVerifier::new(SECRET).unwrap();
        let signature = sign(SECRET, "order_abc", "pay_xyz");
        assert!(verifier.verify("order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_signature_over_different_payment_id_rejected() {
        let verifier = SignatureVerifier::new(SECRET).unwrap();
        let signature = sign(SECRET, "order_abc", "pay_other");
        assert!(!verifier.verify("order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_signature_with_wrong_secret_rejected() {
        let verifier = SignatureVerifier::new(SECRET).unwrap();
        let signature = sign("another_secret", "order_abc", "pay_xyz");
        assert!(!verifier.verify("order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_arbitrary_hex_rejected() {
        let verifier = SignatureVerifier::new(SECRET).unwrap();
        assert!(!verifier.verify("order_abc", "pay_xyz", &"ab".repeat(32)));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let verifier = SignatureVerifier::new(SECRET).unwrap();
        // Not hex at all, odd length, truncated digest
        assert!(!verifier.verify("order_abc", "pay_xyz", "not-hex!"));
        assert!(!verifier.verify("order_abc", "pay_xyz", "abc"));
        assert!(!verifier.verify("order_abc", "pay_xyz", "abcd"));
        assert!(!verifier.verify("order_abc", "pay_xyz", ""));
    }

    #[test]
    fn test_empty_secret_rejected_at_construction() {
        assert!(matches!(
            SignatureVerifier::new(""),
            Err(PaymentError::MisconfiguredCredentials(_))
        ));
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let verifier = SignatureVerifier::new(SECRET).unwrap();
        let signature = sign(SECRET, "order_abc", "pay_xyz").to_uppercase();
        assert!(verifier.verify("order_abc", "pay_xyz", &signature));
    }
}
