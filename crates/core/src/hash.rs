//! Hashing utilities: raw SHA-256 digests and `ALGORITHM:base64` encoded hashes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::str::FromStr;
use thiserror::Error;

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit hash.
pub type H256 = [u8; 32];

/// Errors produced while generating, parsing or verifying hashes.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("malformed encoded hash: {0}")]
    MalformedHash(String),

    #[error("io error while hashing: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HashError>;

/// A wrapper type for H256 with Display and Debug formatting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub H256);

impl Hash {
    /// The zero hash (all zeros).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a new Hash from raw bytes.
    pub fn from_bytes(bytes: H256) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for H256 {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// SHA-256 of arbitrary data.
pub fn hash(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// SHA-256 over several pieces of data, as if they were concatenated.
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

// =============================================================================
// Encoded hashes
// =============================================================================

/// Digest algorithms accepted in encoded hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    /// The name used in the encoded form.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha512 => "SHA-512",
            HashAlgorithm::Blake3 => "BLAKE3",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 | HashAlgorithm::Blake3 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    fn hasher(&self) -> StreamHasher {
        match self {
            HashAlgorithm::Sha256 => StreamHasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => StreamHasher::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => StreamHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SHA-256" => Ok(HashAlgorithm::Sha256),
            "SHA-512" => Ok(HashAlgorithm::Sha512),
            "BLAKE3" => Ok(HashAlgorithm::Blake3),
            other => Err(HashError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

enum StreamHasher {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    fn update(&mut self, bytes: &[u8]) {
        match self {
            StreamHasher::Sha256(h) => h.update(bytes),
            StreamHasher::Sha512(h) => h.update(bytes),
            StreamHasher::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            StreamHasher::Sha256(h) => h.finalize().to_vec(),
            StreamHasher::Sha512(h) => h.finalize().to_vec(),
            StreamHasher::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// A digest tagged with the algorithm that produced it.
///
/// The string form is `ALGORITHM:base64(digest)`, e.g. `SHA-256:uU0nuZNN...`.
/// This is the only hash encoding persisted by the node.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncodedHash {
    algorithm: HashAlgorithm,
    digest: Vec<u8>,
}

impl EncodedHash {
    /// Wrap a digest already computed with `algorithm`.
    pub fn new(algorithm: HashAlgorithm, digest: Vec<u8>) -> Result<Self> {
        if digest.len() != algorithm.output_len() {
            return Err(HashError::MalformedHash(format!(
                "{} digest must be {} bytes, got {}",
                algorithm,
                algorithm.output_len(),
                digest.len()
            )));
        }
        Ok(Self { algorithm, digest })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Whether `data` hashes to this value under the same algorithm.
    pub fn matches(&self, data: &[u8]) -> bool {
        generate_hash(self.algorithm, data) == *self
    }

    /// Stream variant of [`EncodedHash::matches`]; the reader position is restored.
    pub fn matches_reader<R: Read + Seek + ?Sized>(&self, reader: &mut R) -> Result<bool> {
        Ok(generate_hash_reader(self.algorithm, reader)? == *self)
    }
}

impl fmt::Display for EncodedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, STANDARD.encode(&self.digest))
    }
}

impl fmt::Debug for EncodedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedHash({})", self)
    }
}

impl FromStr for EncodedHash {
    type Err = HashError;

    /// Splits on the first `:`; everything after it is the base64 digest.
    fn from_str(s: &str) -> Result<Self> {
        let (name, encoded) = s.split_once(':').ok_or_else(|| {
            HashError::MalformedHash(format!("missing algorithm separator in {s:?}"))
        })?;
        let algorithm: HashAlgorithm = name.parse()?;
        let digest = STANDARD
            .decode(encoded)
            .map_err(|e| HashError::MalformedHash(format!("invalid base64 digest: {e}")))?;
        Self::new(algorithm, digest)
    }
}

impl TryFrom<String> for EncodedHash {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EncodedHash> for String {
    fn from(hash: EncodedHash) -> Self {
        hash.to_string()
    }
}

/// Hash `data` with `algorithm`.
pub fn generate_hash(algorithm: HashAlgorithm, data: &[u8]) -> EncodedHash {
    let mut hasher = algorithm.hasher();
    hasher.update(data);
    EncodedHash {
        algorithm,
        digest: hasher.finalize(),
    }
}

/// Hash everything from the reader's current position to its end.
///
/// The reader is seeked back to where it started before returning, whether
/// hashing succeeded or not, so the same source can be persisted afterwards.
pub fn generate_hash_reader<R: Read + Seek + ?Sized>(
    algorithm: HashAlgorithm,
    reader: &mut R,
) -> Result<EncodedHash> {
    let start = reader.stream_position()?;
    let digest = digest_to_end(algorithm, reader);
    reader.seek(SeekFrom::Start(start))?;
    Ok(EncodedHash {
        algorithm,
        digest: digest?,
    })
}

fn digest_to_end<R: Read + ?Sized>(algorithm: HashAlgorithm, reader: &mut R) -> Result<Vec<u8>> {
    let mut hasher = algorithm.hasher();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Check `data` against an encoded hash string.
///
/// Returns `Ok(false)` on a digest mismatch; errors only when the encoding
/// itself is unusable (unknown algorithm, bad base64).
pub fn verify_hash(encoded: &str, data: &[u8]) -> Result<bool> {
    let expected: EncodedHash = encoded.parse()?;
    Ok(expected.matches(data))
}

/// Stream variant of [`verify_hash`]; the reader position is restored.
pub fn verify_hash_reader<R: Read + Seek + ?Sized>(encoded: &str, reader: &mut R) -> Result<bool> {
    let expected: EncodedHash = encoded.parse()?;
    expected.matches_reader(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_hash_deterministic() {
        let data = b"hello world";
        let h1 = hash(data);
        let h2 = hash(data);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_is_sha256() {
        assert_eq!(
            hash(b"hello world").to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let h = hash(b"test data");
        let parsed = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn test_hash_concat() {
        let h1 = hash_concat(&[b"hello", b"world"]);
        let h2 = hash(b"helloworld");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_generate_sha256_encoding() {
        let encoded = generate_hash(HashAlgorithm::Sha256, b"hello world");
        assert_eq!(
            encoded.to_string(),
            "SHA-256:uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek="
        );
    }

    #[test]
    fn test_generate_sha512_encoding() {
        let encoded = generate_hash(HashAlgorithm::Sha512, b"hello world");
        assert_eq!(
            encoded.to_string(),
            "SHA-512:MJ7MSJwS1utMxA9QyQLytNDtd+5RGnx6m808qG1M2G+YndNbxf9JlnDaNCVbRbDP2DDoH2Bdz33FVC6TrpzXbw=="
        );
    }

    #[test]
    fn test_parse_roundtrip_blake3() {
        let encoded = generate_hash(HashAlgorithm::Blake3, b"chunk");
        let parsed: EncodedHash = encoded.to_string().parse().unwrap();
        assert_eq!(parsed, encoded);
        assert_eq!(parsed.algorithm(), HashAlgorithm::Blake3);
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let result = verify_hash("MD5:AAAA", b"data");
        assert!(matches!(result, Err(HashError::UnsupportedAlgorithm(name)) if name == "MD5"));
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let result: Result<EncodedHash> = "SHA-256".parse();
        assert!(matches!(result, Err(HashError::MalformedHash(_))));
    }

    #[test]
    fn test_wrong_digest_length_is_malformed() {
        let result: Result<EncodedHash> = "SHA-256:AAAA".parse();
        assert!(matches!(result, Err(HashError::MalformedHash(_))));
    }

    #[test]
    fn test_verify_hash() {
        let encoded = generate_hash(HashAlgorithm::Sha256, b"payload").to_string();
        assert!(verify_hash(&encoded, b"payload").unwrap());
        assert!(!verify_hash(&encoded, b"payload!").unwrap());
    }

    #[test]
    fn test_reader_position_restored() {
        let mut cursor = Cursor::new(b"prefix|body".to_vec());
        cursor.seek(SeekFrom::Start(7)).unwrap();

        let encoded = generate_hash_reader(HashAlgorithm::Sha256, &mut cursor).unwrap();

        assert_eq!(cursor.position(), 7);
        assert_eq!(encoded, generate_hash(HashAlgorithm::Sha256, b"body"));
    }

    #[test]
    fn test_verify_hash_reader() {
        let encoded = generate_hash(HashAlgorithm::Sha256, b"streamed").to_string();
        let mut cursor = Cursor::new(b"streamed".to_vec());
        assert!(verify_hash_reader(&encoded, &mut cursor).unwrap());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_serde_as_string() {
        let encoded = generate_hash(HashAlgorithm::Sha256, b"hello world");
        let json = serde_json::to_string(&encoded).unwrap();
        assert_eq!(json, "\"SHA-256:uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek=\"");
        let restored: EncodedHash = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, encoded);
    }
}
