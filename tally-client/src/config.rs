//! Client configuration

/// Admin API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "2024-10";

/// Connection settings for one store
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Store domain (e.g., "acme.myshopify.com")
    pub shop_domain: String,

    /// Admin API access token
    pub access_token: String,

    /// Admin API version (e.g., "2024-10")
    pub api_version: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Overrides `https://{shop_domain}` (local proxies, mock servers)
    pub base_url: Option<String>,
}

impl ClientConfig {
    /// Create a new configuration with default version and timeout
    pub fn new(shop_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: 30,
            base_url: None,
        }
    }

    /// Set the API version
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send requests to `base_url` instead of the store domain
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Full GraphQL endpoint URL
    pub fn endpoint(&self) -> String {
        let base = match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.shop_domain.trim_end_matches('/')),
        };
        format!("{}/admin/api/{}/graphql.json", base, self.api_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_shop_domain() {
        let config = ClientConfig::new("acme.myshopify.com", "shpat_x");
        assert_eq!(
            config.endpoint(),
            "https://acme.myshopify.com/admin/api/2024-10/graphql.json"
        );
    }

    #[test]
    fn endpoint_honours_base_url_and_version() {
        let config = ClientConfig::new("acme.myshopify.com", "shpat_x")
            .with_base_url("http://127.0.0.1:9000/")
            .with_api_version("2025-01");
        assert_eq!(
            config.endpoint(),
            "http://127.0.0.1:9000/admin/api/2025-01/graphql.json"
        );
    }
}
