use serde::{Deserialize, Serialize};
use siphasher::sip128::Hasher128;
use std::fmt::{Debug, Formatter};
use std::hash::Hasher;

/// A 128-bit digest over an asset's byte content plus any importer-visible
/// settings that affect output. Two assets with identical digest and identical
/// importer version are import-equivalent.
///
/// Equality is bitwise. The total order exists so the digest can serve as the
/// final tiebreak in the refresh queue's ordering tuple.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ContentDigest(pub u128);
impl ContentDigest {
    pub const fn null() -> Self {
        ContentDigest(0)
    }

    /// Digest raw content bytes. Keys are fixed so the result is stable
    /// across processes and platforms.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = siphasher::sip128::SipHasher::default();
        hasher.write(bytes);
        ContentDigest(hasher.finish128().as_u128())
    }

    /// Digest content bytes along with a salt covering import settings that
    /// change the produced output (compression choice, etc). The salt is fed
    /// in little-endian form to keep the digest host-endianness independent.
    pub fn compute_with_salt(
        bytes: &[u8],
        salt: u64,
    ) -> Self {
        let mut hasher = siphasher::sip128::SipHasher::default();
        hasher.write(&salt.to_le_bytes());
        hasher.write(bytes);
        ContentDigest(hasher.finish128().as_u128())
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl Debug for ContentDigest {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_tuple("ContentDigest")
            .field(&format!("{:0>32x}", self.0))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::ContentDigest;

    #[test]
    fn digest_is_deterministic() {
        let a = ContentDigest::compute(b"some texture bytes");
        let b = ContentDigest::compute(b"some texture bytes");
        assert_eq!(a, b);
        assert_ne!(a, ContentDigest::compute(b"other texture bytes"));
    }

    #[test]
    fn salt_changes_digest() {
        let unsalted = ContentDigest::compute(b"pixels");
        let salted = ContentDigest::compute_with_salt(b"pixels", 1);
        assert_ne!(unsalted, salted);
        assert_eq!(salted, ContentDigest::compute_with_salt(b"pixels", 1));
        assert_ne!(salted, ContentDigest::compute_with_salt(b"pixels", 2));
    }
}
