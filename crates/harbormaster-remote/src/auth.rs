use crate::{RegistryConfig, RegistryError};
use serde::{Deserialize, Serialize};

/// How a registry hands out credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Anonymous pull token from auth.docker.io.
    DockerHub,
    /// Configured token, or an anonymous pull token from ghcr.io.
    Ghcr,
    /// No token; requests go out unauthenticated.
    Generic,
}

impl Provider {
    pub fn for_registry(registry: &str) -> Self {
        match registry {
            "docker.io" | "index.docker.io" | "registry-1.docker.io" => Self::DockerHub,
            "ghcr.io" => Self::Ghcr,
            _ => Self::Generic,
        }
    }

    /// `service` query parameter for the token endpoint.
    fn service(self) -> Option<&'static str> {
        match self {
            Self::DockerHub => Some("registry.docker.io"),
            Self::Ghcr => Some("ghcr.io"),
            Self::Generic => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredential {
    pub provider: Provider,
    pub bearer_token: Option<String>,
}

impl RegistryCredential {
    pub fn anonymous(provider: Provider) -> Self {
        Self {
            provider,
            bearer_token: None,
        }
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.bearer_token
            .as_ref()
            .map(|token| format!("Bearer {token}"))
    }
}

/// Token endpoint URL granting pull scope on `repository`, for providers that have one.
pub fn token_url(config: &RegistryConfig, provider: Provider, repository: &str) -> Option<String> {
    let base = match provider {
        Provider::DockerHub => &config.docker_hub_auth_url,
        Provider::Ghcr => &config.ghcr_auth_url,
        Provider::Generic => return None,
    };
    let service = provider.service()?;
    Some(format!(
        "{base}?service={service}&scope=repository:{repository}:pull"
    ))
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Extract the bearer token from a token endpoint response body.
///
/// Accepts `token` or `access_token`; anything else is [`RegistryError::MalformedToken`].
pub fn parse_token(body: &str) -> Result<String, RegistryError> {
    let response: TokenResponse =
        serde_json::from_str(body).map_err(|_| RegistryError::MalformedToken)?;
    response
        .token
        .into_iter()
        .chain(response.access_token)
        .find(|token| !token.is_empty())
        .ok_or(RegistryError::MalformedToken)
}
