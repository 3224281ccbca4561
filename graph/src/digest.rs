use std::{fmt, str::FromStr};

use base64::Engine;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha2::Digest as _;

use crate::{Error, Template};

/// Content digest of a template's canonical document.
///
/// Equal digests mean structurally identical graphs, which is what makes
/// build determinism checkable: re-running a builder with the same
/// environment must reproduce the digest bit for bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
#[non_exhaustive]
pub struct TemplateDigest([u8; 32]);

impl TemplateDigest {
    pub const ALG: &'static str = "sha256";

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn digest(template: &Template) -> Self {
        let mut hasher = sha2::Sha256::new();
        let document = template.to_document();
        serde_json::to_writer(HashWriter(&mut hasher), &document)
            .expect("hashing document JSON cannot fail");
        Self(hasher.finalize().into())
    }
}

struct HashWriter<'a>(&'a mut sha2::Sha256);

impl std::io::Write for HashWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl AsRef<[u8]> for TemplateDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TemplateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::ALG)?;
        f.write_str(":")?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(self);
        f.write_str(&encoded)
    }
}

impl FromStr for TemplateDigest {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some((alg, hash_b64)) = input.split_once(':') else {
            return Err(Error::InvalidDigest(input.to_string()));
        };

        if alg != Self::ALG {
            return Err(Error::InvalidDigest(input.to_string()));
        }

        let hash = base64::engine::general_purpose::STANDARD
            .decode(hash_b64)
            .map_err(|_| Error::InvalidDigest(input.to_string()))?;

        let Ok(bytes) = hash.as_slice().try_into() else {
            return Err(Error::InvalidDigest(input.to_string()));
        };

        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_round_trips_display() {
        let digest = TemplateDigest::new([7u8; 32]);
        let parsed: TemplateDigest = digest.to_string().parse().unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn digest_rejects_wrong_algorithm() {
        assert!(matches!(
            "md5:abcd".parse::<TemplateDigest>(),
            Err(Error::InvalidDigest(_))
        ));
    }
}
