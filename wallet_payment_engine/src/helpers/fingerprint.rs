//! # Payment fingerprints
//!
//! A fingerprint identifies one logical purchase intent: the same buyer paying for the same product (or topping up)
//! with the same amount. It is the idempotency-lock key, so it has to be reproducible across client retries and
//! must not depend on anything the client generates. The preimage is
//!
//! ```text
//!     {buyer_id}:{product_id | "topup"}:{amount}
//! ```
//!
//! with the amount in its canonical two-decimal form, hashed with SHA-256 and truncated to the first 32 hex
//! characters.

use sha2::{Digest, Sha256};
use wps_common::Money;

use crate::helpers::hex::to_hex;

pub const FINGERPRINT_LEN: usize = 32;

pub fn payment_fingerprint(buyer_id: i64, product_or_topup: &str, amount: Money) -> String {
    let preimage = format!("{buyer_id}:{product_or_topup}:{amount}");
    let digest = Sha256::digest(preimage.as_bytes());
    let mut fingerprint = to_hex(&digest);
    fingerprint.truncate(FINGERPRINT_LEN);
    fingerprint
}
