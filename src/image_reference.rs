use serde::Serialize;
use std::fmt;

pub static DEFAULT_REGISTRY: &str = "docker.io";
pub static DEFAULT_TAG: &str = "latest";

/// A container image reference split into registry, repository, tag and digest.
///
/// Registries carrying an explicit port (`localhost:5000/app:1.0`) are not
/// understood: the tag is cut at the first colon of the reference.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub registry: String,
    pub repository: String,
    pub tag: String,
    pub digest_algorithm: String,
    pub digest_hash: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    MalformedDigest(String),
}

impl std::error::Error for ParseError {}
impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedDigest(image) => write!(
                f,
                "malformed digest in image {}, expected <algorithm>:<hash>",
                image
            ),
        }
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)?;
        if self.has_digest() {
            write!(f, "@{}:{}", self.digest_algorithm, self.digest_hash)?;
        }
        Ok(())
    }
}

impl Image {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        if s.is_empty() {
            return Ok(Self::default());
        }

        let (name_and_tag, digest) = match s.split_once('@') {
            Some((name_and_tag, digest)) => (name_and_tag, Some(digest)),
            None => (s, None),
        };

        let (digest_algorithm, digest_hash) = match digest {
            Some(digest) => parse_digest(digest)
                .ok_or_else(|| ParseError::MalformedDigest(s.to_string()))?,
            None => (String::new(), String::new()),
        };

        let (name, tag) = name_and_tag
            .split_once(':')
            .unwrap_or((name_and_tag, DEFAULT_TAG));

        let (registry, repository) = match name.split_once('/') {
            Some((host, rest)) if host.contains('.') => (host, rest),
            None if name.contains('.') => (name, ""),
            _ => (DEFAULT_REGISTRY, name),
        };

        Ok(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
            digest_algorithm,
            digest_hash,
        })
    }

    pub fn has_digest(&self) -> bool {
        !self.digest_hash.is_empty()
    }
}

// Exactly one colon, both sides non-empty.
fn parse_digest(digest: &str) -> Option<(String, String)> {
    let (algorithm, hash) = digest.split_once(':')?;
    if algorithm.is_empty() || hash.is_empty() || hash.contains(':') {
        return None;
    }
    Some((algorithm.to_string(), hash.to_string()))
}
