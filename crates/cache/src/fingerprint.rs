use std::fmt::{Display, Formatter, Result as FmtResult};

/// Deterministic BLAKE3 digest of a logical request, used as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; blake3::OUT_LEN]);
impl Fingerprint {
    pub fn of(request: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(request.as_ref()).as_bytes())
    }

    /// Fingerprint of several request components.
    ///
    /// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn of_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; blake3::OUT_LEN] {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", blake3::Hash::from(self.0).to_hex())
    }
}
