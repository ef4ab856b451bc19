//! Client for the npm registry

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use url::Url;

use super::http_client::create_shared_client;
use super::{PackageMetadata, Registry, RegistryError};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Client for the npm registry (or any registry speaking its document API)
pub struct NpmRegistry {
    client: Arc<Client>,
    base_url: String,
}

impl NpmRegistry {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_client(create_shared_client()?))
    }

    pub fn with_client(client: Arc<Client>) -> Self {
        Self {
            client,
            base_url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }

    /// Point the client at another registry, e.g. a private mirror
    pub fn with_base_url(client: Arc<Client>, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn http_client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Document URL for a package (`@scope/name` -> `@scope%2fname`)
    pub fn package_url(&self, package_name: &str) -> Result<Url, RegistryError> {
        let encoded_name = if package_name.starts_with('@') {
            package_name.replace('/', "%2f")
        } else {
            package_name.to_string()
        };
        Ok(Url::parse(&format!("{}/{encoded_name}", self.base_url))?)
    }
}

#[async_trait]
impl Registry for NpmRegistry {
    async fn fetch_package(
        &self,
        name: &str,
        auth_token: Option<&str>,
    ) -> Result<PackageMetadata, RegistryError> {
        let url = self.package_url(name)?;

        let mut request = self.client.get(url);
        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let http_error = |source| RegistryError::Http {
            name: name.to_string(),
            source,
        };

        let response = request.send().await.map_err(http_error)?;
        if !response.status().is_success() {
            return Err(RegistryError::Status {
                name: name.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(http_error)?;
        serde_json::from_slice(&body).map_err(|source| RegistryError::Decode {
            name: name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(base: &str) -> NpmRegistry {
        NpmRegistry::with_base_url(Arc::new(Client::new()), base)
    }

    #[test]
    fn test_package_url() {
        let npm = registry("https://registry.npmjs.org");
        assert_eq!(
            npm.package_url("axios").unwrap().as_str(),
            "https://registry.npmjs.org/axios"
        );
    }

    #[test]
    fn test_scoped_package_url() {
        let npm = registry("https://registry.npmjs.org/");
        assert_eq!(
            npm.package_url("@babel/core").unwrap().as_str(),
            "https://registry.npmjs.org/@babel%2fcore"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let npm = registry("not a url");
        assert!(matches!(
            npm.package_url("axios"),
            Err(RegistryError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_default_base_url() {
        let npm = NpmRegistry::with_client(Arc::new(Client::new()));
        assert_eq!(npm.base_url(), DEFAULT_REGISTRY_URL);
    }
}
