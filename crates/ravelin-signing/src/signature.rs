//! HMAC-SHA512 request signatures over the canonical string.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::canonical::{canonical_string, SigningContext};
use crate::SigningError;

type HmacSha512 = Hmac<Sha512>;

/// Length of a hex-encoded SHA-512 digest.
pub const SIGNATURE_HEX_LEN: usize = 128;

/// Sign a request: lowercase hex of `HMAC-SHA512(secret, canonical)`.
pub fn sign(secret: &[u8], ctx: &SigningContext<'_>) -> Result<String, SigningError> {
    let mac = keyed_mac(secret, &canonical_string(ctx)?);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a candidate signature in fixed time.
///
/// Length is checked before anything is computed; hex case is ignored.
pub fn verify(
    candidate: &str,
    secret: &[u8],
    ctx: &SigningContext<'_>,
) -> Result<bool, SigningError> {
    if candidate.len() != SIGNATURE_HEX_LEN {
        return Ok(false);
    }
    let Ok(candidate) = hex::decode(candidate) else {
        return Ok(false);
    };

    let mac = keyed_mac(secret, &canonical_string(ctx)?);
    Ok(mac.verify_slice(&candidate).is_ok())
}

fn keyed_mac(secret: &[u8], canonical: &str) -> HmacSha512 {
    let mut mac = HmacSha512::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(canonical.as_bytes());
    mac
}

/// Signs and verifies with a process-wide application secret.
///
/// Callers holding a per-principal secret use the `*_with` variants.
#[derive(Clone)]
pub struct SignatureEngine {
    app_secret: Vec<u8>,
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

impl SignatureEngine {
    pub fn new(app_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            app_secret: app_secret.into(),
        }
    }

    pub fn sign(&self, ctx: &SigningContext<'_>) -> Result<String, SigningError> {
        sign(&self.app_secret, ctx)
    }

    pub fn verify(&self, candidate: &str, ctx: &SigningContext<'_>) -> Result<bool, SigningError> {
        verify(candidate, &self.app_secret, ctx)
    }

    /// Sign with `secret`, falling back to the application secret.
    pub fn sign_with(
        &self,
        secret: Option<&[u8]>,
        ctx: &SigningContext<'_>,
    ) -> Result<String, SigningError> {
        sign(secret.unwrap_or(&self.app_secret), ctx)
    }

    /// Verify with `secret`, falling back to the application secret.
    pub fn verify_with(
        &self,
        candidate: &str,
        secret: Option<&[u8]>,
        ctx: &SigningContext<'_>,
    ) -> Result<bool, SigningError> {
        verify(candidate, secret.unwrap_or(&self.app_secret), ctx)
    }
}
