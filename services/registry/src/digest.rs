//! Content digests

use std::fmt;
use std::str::FromStr;

use sha2::{Digest as _, Sha256, Sha512};

/// Reasons a digest string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidDigest {
    /// There is no `<algorithm>:` prefix.
    #[error("digest {0:?} is missing an algorithm prefix")]
    MissingAlgorithm(String),

    /// The algorithm is not one this registry can verify.
    #[error("unsupported digest algorithm: {0:?}")]
    UnsupportedAlgorithm(String),

    /// The encoded part is not lowercase hex.
    #[error("digest {0:?} is not lowercase hex encoded")]
    BadEncoding(String),

    /// The encoded part has the wrong length for the algorithm.
    #[error("{algorithm} digest must have {expected} hex characters, got {actual}")]
    BadLength {
        /// The digest algorithm.
        algorithm: Algorithm,
        /// Required number of hex characters.
        expected: usize,
        /// Number of hex characters found.
        actual: usize,
    },
}

/// Hash algorithms accepted in digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    /// SHA-256, the default for manifests.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl Algorithm {
    /// The algorithm name as used in digest strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Length of the hex encoded hash.
    pub fn hex_len(&self) -> usize {
        match self {
            Algorithm::Sha256 => 64,
            Algorithm::Sha512 => 128,
        }
    }

    /// Hash `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Digest {
        let hex = match self {
            Algorithm::Sha256 => hex::encode(Sha256::digest(data)),
            Algorithm::Sha512 => hex::encode(Sha512::digest(data)),
        };
        Digest {
            algorithm: *self,
            hex,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = InvalidDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Algorithm::Sha256),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(InvalidDigest::UnsupportedAlgorithm(other.to_owned())),
        }
    }
}

/// A content digest such as `sha256:e3b0c442...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    algorithm: Algorithm,
    hex: String,
}

impl Digest {
    /// SHA-256 digest of `data`.
    pub fn sha256(data: &[u8]) -> Self {
        Algorithm::Sha256.digest(data)
    }

    /// The hash algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The lowercase hex encoded hash.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Whether `data` hashes to this digest.
    pub fn verify(&self, data: &[u8]) -> bool {
        self.algorithm.digest(data) == *self
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = InvalidDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .split_once(':')
            .filter(|(algorithm, _)| !algorithm.is_empty())
            .ok_or_else(|| InvalidDigest::MissingAlgorithm(s.to_owned()))?;

        let algorithm: Algorithm = algorithm.parse()?;

        if !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(InvalidDigest::BadEncoding(s.to_owned()));
        }

        if hex.len() != algorithm.hex_len() {
            return Err(InvalidDigest::BadLength {
                algorithm,
                expected: algorithm.hex_len(),
                actual: hex.len(),
            });
        }

        Ok(Digest {
            algorithm,
            hex: hex.to_owned(),
        })
    }
}

impl TryFrom<String> for Digest {
    type Error = InvalidDigest;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str =
        "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn computes_sha256() {
        let digest = Digest::sha256(b"");
        assert_eq!(digest.to_string(), EMPTY_SHA256);
        assert_eq!(digest.algorithm(), Algorithm::Sha256);
        assert!(digest.verify(b""));
        assert!(!digest.verify(b"not empty"));
    }

    #[test]
    fn computes_sha512() {
        let digest = Algorithm::Sha512.digest(b"manifest");
        assert_eq!(digest.hex().len(), 128);
        assert_eq!(digest.to_string().parse::<Digest>().unwrap(), digest);
    }

    #[test]
    fn parses_canonical_form() {
        let digest: Digest = EMPTY_SHA256.parse().unwrap();
        assert_eq!(digest, Digest::sha256(b""));
        assert_eq!(digest.to_string(), EMPTY_SHA256);
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(
            "e3b0c442".parse::<Digest>(),
            Err(InvalidDigest::MissingAlgorithm(_))
        ));
        assert!(matches!(
            ":e3b0c442".parse::<Digest>(),
            Err(InvalidDigest::MissingAlgorithm(_))
        ));
        assert_eq!(
            "md5:d41d8cd98f00b204e9800998ecf8427e".parse::<Digest>(),
            Err(InvalidDigest::UnsupportedAlgorithm("md5".into()))
        );
        assert!(matches!(
            EMPTY_SHA256.to_uppercase().replace("SHA256", "sha256").parse::<Digest>(),
            Err(InvalidDigest::BadEncoding(_))
        ));
        assert_eq!(
            "sha256:abc123".parse::<Digest>(),
            Err(InvalidDigest::BadLength {
                algorithm: Algorithm::Sha256,
                expected: 64,
                actual: 6
            })
        );
        assert!(matches!(
            "sha256:".parse::<Digest>(),
            Err(InvalidDigest::BadLength { actual: 0, .. })
        ));
    }
}
