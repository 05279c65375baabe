//! Registry access for checking whether a newer image is available.
//!
//! This crate resolves the remote content digest of an image reference through the
//! registry v2 API: anonymous bearer tokens for Docker Hub and GHCR (or a supplied
//! GHCR token), a `HEAD` on the manifest endpoint, and the `Docker-Content-Digest`
//! response header. Every request goes through one primitive that classifies
//! transport and HTTP failures into [`RegistryError`] codes.

pub mod auth;
pub mod config;
pub mod http;

pub use auth::{Provider, RegistryCredential};
pub use config::{default_config_path, ConfigError, RegistryConfig};
pub use http::{HttpReply, Method, RegistryClient, MANIFEST_MEDIA_TYPES};

use harbormaster_schema::ImageReference;
use thiserror::Error;

/// Why a remote digest could not be obtained.
///
/// Each variant maps to a stable snake_case code via [`RegistryError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("DNS lookup failed: {0}")]
    Dns(String),
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("TLS error: {0}")]
    Ssl(String),
    #[error("unauthorized (HTTP 401)")]
    Unauthorized,
    #[error("forbidden (HTTP 403)")]
    Forbidden,
    #[error("not found (HTTP 404)")]
    NotFound,
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("registry server error (HTTP {0})")]
    ServerError(u16),
    #[error("unexpected HTTP status {0}")]
    Http(u16),
    #[error("no response from registry: {0}")]
    NoResponse(String),
    #[error("token endpoint returned no usable token")]
    MalformedToken,
    #[error("registry response has no Docker-Content-Digest header")]
    NoDigestInResponse,
}

impl RegistryError {
    /// Map a non-success HTTP status to its error; `None` for 2xx/3xx.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=399 => None,
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            429 => Some(Self::RateLimited),
            500..=599 => Some(Self::ServerError(status)),
            other => Some(Self::Http(other)),
        }
    }

    pub fn code(&self) -> String {
        match self {
            Self::Dns(_) => "dns_error".to_owned(),
            Self::ConnectionRefused(_) => "connection_refused".to_owned(),
            Self::Timeout(_) => "timeout".to_owned(),
            Self::Ssl(_) => "ssl_error".to_owned(),
            Self::Unauthorized => "unauthorized".to_owned(),
            Self::Forbidden => "forbidden".to_owned(),
            Self::NotFound => "not_found".to_owned(),
            Self::RateLimited => "rate_limited".to_owned(),
            Self::ServerError(_) => "server_error".to_owned(),
            Self::Http(code) => format!("http_{code}"),
            Self::NoResponse(_) => "no_response".to_owned(),
            Self::MalformedToken => "malformed_token".to_owned(),
            Self::NoDigestInResponse => "no_digest_in_response".to_owned(),
        }
    }

    /// Actionable advice for this failure against `registry`, if there is any.
    pub fn hint(&self, registry: &str) -> Option<&'static str> {
        match (self, registry) {
            (Self::RateLimited, "docker.io") => {
                Some("Docker Hub rate limit reached; run `docker login` to raise the pull quota")
            }
            (Self::RateLimited, _) => Some("registry rate limit reached; retry later"),
            (Self::Unauthorized, "ghcr.io") => {
                Some("set GHCR_TOKEN to a token with read:packages to check this image")
            }
            (Self::Unauthorized | Self::Forbidden, _) => {
                Some("the registry refused anonymous access; the image may be private")
            }
            (Self::NotFound, _) => Some("check the image name and tag"),
            (
                Self::Dns(_) | Self::ConnectionRefused(_) | Self::Timeout(_) | Self::NoResponse(_),
                _,
            ) => Some("check network connectivity to the registry"),
            (Self::Ssl(_), _) => {
                Some("TLS failed; list the host under insecure_registries if it serves plain HTTP")
            }
            _ => None,
        }
    }
}

/// Source of remote manifest digests.
pub trait DigestSource: Send + Sync {
    /// Digest the registry currently serves for `image`. Digest-pinned references
    /// return their embedded digest without network access.
    fn remote_digest(&self, image: &ImageReference) -> Result<String, RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(RegistryError::from_status(200), None);
        assert_eq!(RegistryError::from_status(307), None);
        assert_eq!(
            RegistryError::from_status(401),
            Some(RegistryError::Unauthorized)
        );
        assert_eq!(
            RegistryError::from_status(403),
            Some(RegistryError::Forbidden)
        );
        assert_eq!(
            RegistryError::from_status(404),
            Some(RegistryError::NotFound)
        );
        assert_eq!(
            RegistryError::from_status(429),
            Some(RegistryError::RateLimited)
        );
        assert_eq!(
            RegistryError::from_status(503),
            Some(RegistryError::ServerError(503))
        );
        assert_eq!(
            RegistryError::from_status(418),
            Some(RegistryError::Http(418))
        );
    }

    #[test]
    fn codes_match_taxonomy() {
        assert_eq!(RegistryError::Dns(String::new()).code(), "dns_error");
        assert_eq!(
            RegistryError::ConnectionRefused(String::new()).code(),
            "connection_refused"
        );
        assert_eq!(RegistryError::Timeout(String::new()).code(), "timeout");
        assert_eq!(RegistryError::Ssl(String::new()).code(), "ssl_error");
        assert_eq!(RegistryError::ServerError(502).code(), "server_error");
        assert_eq!(RegistryError::Http(418).code(), "http_418");
        assert_eq!(RegistryError::NoResponse(String::new()).code(), "no_response");
        assert_eq!(RegistryError::MalformedToken.code(), "malformed_token");
        assert_eq!(
            RegistryError::NoDigestInResponse.code(),
            "no_digest_in_response"
        );
    }

    #[test]
    fn hints_are_registry_aware() {
        let docker = RegistryError::RateLimited.hint("docker.io").unwrap();
        assert!(docker.contains("docker login"));
        let ghcr = RegistryError::Unauthorized.hint("ghcr.io").unwrap();
        assert!(ghcr.contains("GHCR_TOKEN"));
        assert!(RegistryError::MalformedToken.hint("docker.io").is_none());
    }
}
