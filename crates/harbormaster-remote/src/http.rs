use crate::auth::{parse_token, token_url, Provider, RegistryCredential};
use crate::{DigestSource, RegistryConfig, RegistryError};
use harbormaster_schema::ImageReference;

/// Manifest media types offered in `Accept`, so multi-arch indexes resolve to the
/// same digest `docker pull` would record.
pub const MANIFEST_MEDIA_TYPES: &[&str] = &[
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.oci.image.manifest.v1+json",
    "application/vnd.oci.image.index.v1+json",
];

const DIGEST_HEADER: &str = "docker-content-digest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

/// A successful (2xx/3xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
    pub digest: Option<String>,
}

/// Registry v2 client.
///
/// - `GET  <auth endpoint>?service=..&scope=repository:<repo>:pull`: bearer token
/// - `HEAD <endpoint>/v2/<repo>/manifests/<tag>`: `Docker-Content-Digest`
pub struct RegistryClient {
    config: RegistryConfig,
    agent: ureq::Agent,
}

impl RegistryClient {
    pub fn new(config: RegistryConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_connect(Some(config.connect_timeout()))
            .timeout_global(Some(config.total_timeout()))
            .http_status_as_error(false)
            .build();
        let agent = ureq::Agent::new_with_config(agent_config);
        Self { config, agent }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Perform one request. Every network call in this crate goes through here.
    ///
    /// Non-success statuses and transport failures come back as their
    /// [`RegistryError`] classification.
    pub fn fetch(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<HttpReply, RegistryError> {
        tracing::debug!("{method:?} {url}");
        let mut req = match method {
            Method::Get => self.agent.get(url),
            Method::Head => self.agent.head(url),
        };
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        let mut resp = req.call().map_err(|e| classify_transport(&e))?;

        let status = resp.status().as_u16();
        let digest = resp
            .headers()
            .get(DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        let body = match method {
            Method::Head => String::new(),
            Method::Get => resp
                .body_mut()
                .read_to_string()
                .map_err(|e| classify_transport(&e))?,
        };

        if let Some(err) = RegistryError::from_status(status) {
            tracing::debug!("{method:?} {url} -> HTTP {status}");
            return Err(err);
        }
        Ok(HttpReply {
            status,
            body,
            digest,
        })
    }

    /// Credentials for pulling `image`: the configured GHCR token, an anonymous
    /// token from the provider's endpoint, or none for generic registries.
    pub fn credential(&self, image: &ImageReference) -> Result<RegistryCredential, RegistryError> {
        let provider = Provider::for_registry(&image.registry);
        if provider == Provider::Ghcr {
            if let Some(token) = &self.config.ghcr_token {
                return Ok(RegistryCredential {
                    provider,
                    bearer_token: Some(token.clone()),
                });
            }
        }
        let Some(url) = token_url(&self.config, provider, &image.repository) else {
            return Ok(RegistryCredential::anonymous(provider));
        };
        let reply = self.fetch(Method::Get, &url, &[])?;
        let token = parse_token(&reply.body)?;
        Ok(RegistryCredential {
            provider,
            bearer_token: Some(token),
        })
    }

    /// Resolve the digest the registry serves for `image`.
    pub fn manifest_digest(&self, image: &ImageReference) -> Result<String, RegistryError> {
        if let Some(digest) = image.digest() {
            return Ok(digest.to_owned());
        }

        let credential = self.credential(image)?;
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.config.endpoint_for(&image.registry),
            image.repository,
            image.tag_or_digest
        );
        let mut headers = vec![("Accept", MANIFEST_MEDIA_TYPES.join(", "))];
        if let Some(auth) = credential.authorization_header() {
            headers.push(("Authorization", auth));
        }

        let reply = self.fetch(Method::Head, &url, &headers)?;
        let digest = reply.digest.ok_or(RegistryError::NoDigestInResponse)?;
        tracing::debug!("{image} -> {digest}");
        Ok(digest)
    }
}

impl DigestSource for RegistryClient {
    fn remote_digest(&self, image: &ImageReference) -> Result<String, RegistryError> {
        self.manifest_digest(image)
    }
}

fn classify_transport(err: &ureq::Error) -> RegistryError {
    match err {
        ureq::Error::StatusCode(code) => {
            RegistryError::from_status(*code).unwrap_or(RegistryError::Http(*code))
        }
        ureq::Error::Timeout(_) => RegistryError::Timeout(err.to_string()),
        ureq::Error::HostNotFound => RegistryError::Dns(err.to_string()),
        ureq::Error::Rustls(_) => RegistryError::Ssl(err.to_string()),
        ureq::Error::Io(io) => match io.kind() {
            std::io::ErrorKind::ConnectionRefused => {
                RegistryError::ConnectionRefused(io.to_string())
            }
            std::io::ErrorKind::TimedOut => RegistryError::Timeout(io.to_string()),
            _ => classify_message(&io.to_string()),
        },
        other => classify_message(&other.to_string()),
    }
}

/// Classify a transport failure from its message.
fn classify_message(message: &str) -> RegistryError {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
    if has(&["dns", "lookup", "resolve", "name or service not known", "host not found"]) {
        RegistryError::Dns(message.to_owned())
    } else if has(&["refused"]) {
        RegistryError::ConnectionRefused(message.to_owned())
    } else if has(&["timed out", "timeout"]) {
        RegistryError::Timeout(message.to_owned())
    } else if has(&["tls", "ssl", "certificate", "handshake", "corrupt message"]) {
        RegistryError::Ssl(message.to_owned())
    } else {
        RegistryError::NoResponse(message.to_owned())
    }
}
