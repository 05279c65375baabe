use harbormaster_remote::RegistryError;
use harbormaster_schema::{is_upgradeable, ImageReference};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Pinned,
    NotPulled,
    Current,
    Update,
    Error,
}

impl ServiceStatus {
    pub const ALL: [Self; 5] = [
        Self::Pinned,
        Self::NotPulled,
        Self::Current,
        Self::Update,
        Self::Error,
    ];
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pinned => "PINNED",
            Self::NotPulled => "NOT_PULLED",
            Self::Current => "CURRENT",
            Self::Update => "UPDATE",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Outcome of checking one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestComparison {
    pub service_name: String,
    pub resolved_image: ImageReference,
    pub local_digest: Option<String>,
    pub remote_digest: Option<String>,
    pub status: ServiceStatus,
    pub upgradeable: bool,
    /// Registry error code when `status` is `ERROR`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Apply the decision table to one service, first matching row wins:
///
/// 1. digest-pinned reference → `PINNED`, local and remote set to the embedded digest
/// 2. remote lookup failed → `PINNED` without an error when the tag is not
///    upgradeable, else `ERROR` with the error code
/// 3. no local digest → `NOT_PULLED`
/// 4. tag is not upgradeable → `PINNED`
/// 5. local == remote → `CURRENT`
/// 6. otherwise → `UPDATE`
pub fn compare(
    service_name: &str,
    image: ImageReference,
    local_digest: Option<String>,
    remote: Result<String, RegistryError>,
) -> DigestComparison {
    let mut result = DigestComparison {
        service_name: service_name.to_owned(),
        resolved_image: image,
        local_digest,
        remote_digest: None,
        status: ServiceStatus::Error,
        upgradeable: false,
        error: None,
        hint: None,
    };

    if let Some(digest) = result.resolved_image.digest().map(str::to_owned) {
        result.local_digest = Some(digest.clone());
        result.remote_digest = Some(digest);
        result.status = ServiceStatus::Pinned;
        return result;
    }

    let tag_upgradeable = is_upgradeable(&result.resolved_image.tag_or_digest);
    let remote_digest = match remote {
        Ok(digest) => digest,
        Err(_) if !tag_upgradeable => {
            result.status = ServiceStatus::Pinned;
            return result;
        }
        Err(err) => {
            result.error = Some(err.code());
            result.hint = err
                .hint(&result.resolved_image.registry)
                .map(str::to_owned);
            return result;
        }
    };
    result.remote_digest = Some(remote_digest);

    result.status = match &result.local_digest {
        None => ServiceStatus::NotPulled,
        Some(_) if !tag_upgradeable => ServiceStatus::Pinned,
        Some(local) if result.remote_digest.as_ref() == Some(local) => ServiceStatus::Current,
        Some(_) => ServiceStatus::Update,
    };
    result.upgradeable = tag_upgradeable;
    result
}
