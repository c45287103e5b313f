//! Webhook signature verification.
//!
//! GitHub signs every delivery with HMAC-SHA1 over the raw body and
//! sends the digest in `X-Hub-Signature` as `sha1=<hex>`. Verification
//! happens before any payload parsing; the comparison is constant-time.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Why a delivery was rejected at the signature gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRejection {
    /// `X-Hub-Signature` header absent
    MissingHeader,
    /// Header present but the scheme is not `sha1`
    UnsupportedScheme,
    /// Header present but not of the form `<scheme>=<hex>`
    Malformed,
    /// Digest did not match the body
    Mismatch,
}

impl std::fmt::Display for SignatureRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "X-Hub-Signature header missing"),
            Self::UnsupportedScheme => write!(f, "unsupported signature scheme"),
            Self::Malformed => write!(f, "malformed signature header"),
            Self::Mismatch => write!(f, "signature mismatch"),
        }
    }
}

/// Shared webhook secret
pub struct WebhookSecret {
    secret: String,
}

impl WebhookSecret {
    /// Wrap the shared secret
    #[must_use]
    pub const fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Verify `header` against the HMAC-SHA1 digest of `body`.
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> Result<(), SignatureRejection> {
        let header = header.ok_or(SignatureRejection::MissingHeader)?;
        let (scheme, digest_hex) = header
            .split_once('=')
            .ok_or(SignatureRejection::Malformed)?;
        if scheme != "sha1" {
            return Err(SignatureRejection::UnsupportedScheme);
        }

        let digest = hex::decode(digest_hex).map_err(|_| SignatureRejection::Malformed)?;

        let mut mac = HmacSha1::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureRejection::Malformed)?;
        mac.update(body);
        mac.verify_slice(&digest)
            .map_err(|_| SignatureRejection::Mismatch)
    }
}

/// Compute the `sha1=<hex>` header value for `body`.
///
/// Used by tests and by operators replaying deliveries by hand.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}
