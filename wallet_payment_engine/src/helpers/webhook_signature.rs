//! # Gateway callback signatures
//!
//! Every callback from the payment gateway carries a `signature_key` proving it knows our server key:
//!
//! ```text
//!     signature_key = hex(SHA-512(order_id + status_code + gross_amount + server_key))
//! ```
//!
//! computed over the raw field strings exactly as they appear in the payload. Verification recomputes the digest,
//! format-checks both sides as 128-character hex, and compares in constant time. All of this happens before the
//! payload is allowed anywhere near stored data; a payload that fails here must not cause a single row to be read.

use sha2::{Digest, Sha512};
use thiserror::Error;

use crate::helpers::hex::to_hex;

pub const SIGNATURE_HEX_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The signature is not a {SIGNATURE_HEX_LEN}-character hex digest")]
    MalformedDigest,
    #[error("The signature does not match the payload")]
    DigestMismatch,
}

pub fn compute_callback_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    to_hex(&hasher.finalize())
}

/// `^[0-9a-fA-F]{128}$`
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == SIGNATURE_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Equality that always scans the full slice, so the comparison time does not leak how long a matching prefix a
/// forged digest had.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn verify_callback_signature(
    received: &str,
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> Result<(), SignatureError> {
    if !is_hex_digest(received) {
        return Err(SignatureError::MalformedDigest);
    }
    let expected = compute_callback_signature(order_id, status_code, gross_amount, server_key);
    if !is_hex_digest(&expected) {
        return Err(SignatureError::MalformedDigest);
    }
    // Uppercase hex is within the wire format; normalise before the byte compare.
    let received = received.to_ascii_lowercase();
    if constant_time_eq(received.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::DigestMismatch)
    }
}
