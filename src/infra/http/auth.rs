//! Bearer-token admin authentication.

use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

/// Accepted admin tokens, held as SHA-256 digests.
#[derive(Debug, Clone, Default)]
pub struct AdminTokens {
    hashes: Vec<[u8; 32]>,
}

impl AdminTokens {
    pub fn new(hashes: Vec<[u8; 32]>) -> Self {
        Self { hashes }
    }

    /// Convenience for tests and tooling that start from plain tokens.
    pub fn from_plain<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            tokens
                .into_iter()
                .map(|token| digest(token.as_ref()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Compares against every configured digest so timing does not depend on which one matched.
    pub fn verify(&self, token: &str) -> bool {
        let candidate = digest(token);
        let matched = self
            .hashes
            .iter()
            .fold(Choice::from(0), |acc, hash| {
                acc | hash.as_slice().ct_eq(candidate.as_slice())
            });
        bool::from(matched)
    }
}

fn digest(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Hex digest to place in `auth.admin_token_hashes`.
pub fn hash_token(token: &str) -> String {
    hex::encode(digest(token))
}

pub(crate) fn bearer_token(header: Option<&axum::http::HeaderValue>) -> Option<&str> {
    let raw = header?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn verify_accepts_only_configured_tokens() {
        let tokens = AdminTokens::from_plain(["alpha", "beta"]);
        assert!(tokens.verify("alpha"));
        assert!(tokens.verify("beta"));
        assert!(!tokens.verify("gamma"));
        assert!(!AdminTokens::default().verify("alpha"));
    }

    #[test]
    fn hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let header = HeaderValue::from_static("Bearer s3cret");
        assert_eq!(bearer_token(Some(&header)), Some("s3cret"));

        let header = HeaderValue::from_static("Basic s3cret");
        assert_eq!(bearer_token(Some(&header)), None);
        assert_eq!(bearer_token(None), None);
    }
}
