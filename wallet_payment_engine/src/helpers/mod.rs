mod fingerprint;
mod hex;
mod webhook_signature;

pub use fingerprint::{payment_fingerprint, FINGERPRINT_LEN};
pub use webhook_signature::{
    compute_callback_signature,
    constant_time_eq,
    is_hex_digest,
    verify_callback_signature,
    SignatureError,
    SIGNATURE_HEX_LEN,
};
