use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry assumed when the reference names none.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed when the reference carries neither tag nor digest.
pub const DEFAULT_TAG: &str = "latest";

const DIGEST_MARKER: &str = "@sha256:";

/// A fully-qualified image reference.
///
/// `tag_or_digest` is never empty: it holds the explicit tag, `latest`, or for
/// digest-pinned references the `sha256:<hex>` digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub tag_or_digest: String,
    pub is_digest_pinned: bool,
}

impl ImageReference {
    /// Normalize an already-substituted reference string.
    ///
    /// - `nginx` → `docker.io/library/nginx:latest`
    /// - `myorg/app:1.2` → `docker.io/myorg/app:1.2`
    /// - `ghcr.io/org/app:v1.0` → `ghcr.io/org/app:v1.0`
    /// - `localhost:5000/app` → `localhost:5000/app:latest`
    /// - `redis@sha256:<hex>` → `docker.io/library/redis@sha256:<hex>` (pinned)
    pub fn normalize(reference: &str) -> Self {
        let reference = reference.trim();

        let (name, tag_or_digest, is_digest_pinned) = match split_digest(reference) {
            Some((name_part, digest)) => (split_tag(name_part).0, digest.to_owned(), true),
            None => {
                let (name, tag) = split_tag(reference);
                let tag = tag.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TAG);
                (name, tag.to_owned(), false)
            }
        };

        let (registry, repository) = split_registry(name);
        Self {
            registry,
            repository,
            tag_or_digest,
            is_digest_pinned,
        }
    }

    /// The tag, or `None` for digest-pinned references.
    pub fn tag(&self) -> Option<&str> {
        (!self.is_digest_pinned).then_some(self.tag_or_digest.as_str())
    }

    /// The embedded digest of a pinned reference.
    pub fn digest(&self) -> Option<&str> {
        self.is_digest_pinned.then_some(self.tag_or_digest.as_str())
    }

    pub fn full_reference(&self) -> String {
        let separator = if self.is_digest_pinned { '@' } else { ':' };
        format!(
            "{}/{}{separator}{}",
            self.registry, self.repository, self.tag_or_digest
        )
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_reference())
    }
}

/// Split `name@sha256:<hex>` into `(name, "sha256:<hex>")`.
fn split_digest(reference: &str) -> Option<(&str, &str)> {
    let pos = reference.find(DIGEST_MARKER)?;
    let hex = &reference[pos + DIGEST_MARKER.len()..];
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some((&reference[..pos], &reference[pos + 1..]))
}

/// Split at the last `:` that follows the final `/`.
fn split_tag(name: &str) -> (&str, Option<&str>) {
    let last_segment_start = name.rfind('/').map_or(0, |slash| slash + 1);
    match name[last_segment_start..].rfind(':') {
        Some(colon) => {
            let colon = last_segment_start + colon;
            (&name[..colon], Some(&name[colon + 1..]))
        }
        None => (name, None),
    }
}

fn split_registry(name: &str) -> (String, String) {
    if let Some((first, rest)) = name.split_once('/') {
        if first.contains('.') || first.contains(':') || first == "localhost" {
            return (first.to_owned(), rest.to_owned());
        }
        return (DEFAULT_REGISTRY.to_owned(), name.to_owned());
    }
    (DEFAULT_REGISTRY.to_owned(), format!("library/{name}"))
}
