// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Secret storage.

use faaslink_protocol::resource_proto::{
    SecretAccessRequest, SecretPutRequest, resource_request, resource_response,
};
use tracing::instrument;

use super::{ResourceChannel, unexpected};
use crate::error::ResourceError;

/// Version alias resolving to the newest version of a secret.
pub const LATEST: &str = "latest";

/// A resolved secret value.
#[derive(Clone, PartialEq)]
pub struct Secret {
    pub name: String,
    pub version: String,
    pub value: Vec<u8>,
}

impl Secret {
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.value)
    }
}

// Keep values out of logs.
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("value", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct SecretClient {
    channel: ResourceChannel,
}

impl SecretClient {
    pub fn new(channel: ResourceChannel) -> Self {
        Self { channel }
    }

    /// Store a new version of `name`. Returns the version id.
    #[instrument(skip(self, value))]
    pub async fn put(&self, name: &str, value: &[u8]) -> Result<String, ResourceError> {
        let request = resource_request::Request::SecretPut(SecretPutRequest {
            name: name.to_string(),
            value: value.to_vec(),
        });

        match self.channel.call(request).await? {
            resource_response::Response::SecretPut(resp) => Ok(resp.version),
            _ => Err(unexpected("SecretPutResponse")),
        }
    }

    /// Read `name` at `version`, or the latest version when `None`.
    #[instrument(skip(self))]
    pub async fn access(&self, name: &str, version: Option<&str>) -> Result<Secret, ResourceError> {
        let request = resource_request::Request::SecretAccess(SecretAccessRequest {
            name: name.to_string(),
            version: version.unwrap_or(LATEST).to_string(),
        });

        match self.channel.call(request).await? {
            resource_response::Response::SecretAccess(resp) => Ok(Secret {
                name: resp.name,
                version: resp.version,
                value: resp.value,
            }),
            _ => Err(unexpected("SecretAccessResponse")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::mock::{MockTransport, channel};
    use faaslink_protocol::resource_proto::{
        ErrorResponse, SecretAccessResponse, SecretPutResponse, StatusCode,
    };

    fn secret_store() -> std::sync::Arc<MockTransport> {
        MockTransport::new(|request| match request {
            resource_request::Request::SecretPut(_) => {
                resource_response::Response::SecretPut(SecretPutResponse {
                    version: "3".to_string(),
                })
            }
            resource_request::Request::SecretAccess(access) if access.name == "api-key" => {
                resource_response::Response::SecretAccess(SecretAccessResponse {
                    name: access.name.clone(),
                    version: if access.version == LATEST {
                        "3".to_string()
                    } else {
                        access.version.clone()
                    },
                    value: b"s3cr3t".to_vec(),
                })
            }
            _ => resource_response::Response::Error(ErrorResponse::new(
                StatusCode::NotFound,
                "no such secret",
            )),
        })
    }

    #[tokio::test]
    async fn test_access_defaults_to_latest() {
        let transport = secret_store();
        let secrets = SecretClient::new(channel(&transport));

        let secret = secrets.access("api-key", None).await.unwrap();
        assert_eq!(secret.version, "3");
        assert_eq!(secret.as_str().unwrap(), "s3cr3t");
        assert!(!format!("{:?}", secret).contains("s3cr3t"));

        let pinned = secrets.access("api-key", Some("1")).await.unwrap();
        assert_eq!(pinned.version, "1");
    }

    #[tokio::test]
    async fn test_put_and_missing_secret() {
        let transport = secret_store();
        let secrets = SecretClient::new(channel(&transport));

        assert_eq!(secrets.put("api-key", b"new").await.unwrap(), "3");
        let err = secrets.access("other", None).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
