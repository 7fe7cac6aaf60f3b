//! Request signing for Ravelin.
//!
//! A signature is the lowercase hex HMAC-SHA512 of a canonical string built
//! from the request method, URL and JSON body. Independent signers and
//! verifiers produce the same string for logically equal requests, whatever
//! the query or key order.

pub mod canonical;
pub mod error;
pub mod signature;

pub use canonical::{canonical_string, strict_encode, SigningContext};
pub use error::SigningError;
pub use signature::{sign, verify, SignatureEngine, SIGNATURE_HEX_LEN};
