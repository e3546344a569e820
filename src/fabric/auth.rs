use super::types::FabricError;
use async_trait::async_trait;

/// What an issued authorization token grants access to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenScope {
    pub library_id: String,
    pub object_id: String,
    pub write_token: Option<String>,
}

/// Issues authorization tokens for fabric clients
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, scope: &TokenScope) -> Result<String, FabricError>;
}

/// Hands out one preconfigured bearer token regardless of scope
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIssuer {
    token: Option<String>,
}

impl StaticTokenIssuer {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenIssuer for StaticTokenIssuer {
    async fn issue(&self, _scope: &TokenScope) -> Result<String, FabricError> {
        self.token
            .clone()
            .ok_or_else(|| FabricError::Config("no auth token configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> TokenScope {
        TokenScope {
            library_id: "ilibY".to_string(),
            object_id: "iq__X".to_string(),
            write_token: Some("tqw__T".to_string()),
        }
    }

    #[tokio::test]
    async fn test_static_issuer() {
        let issuer = StaticTokenIssuer::new(Some("atxsj_abc".to_string()));
        assert_eq!(issuer.issue(&scope()).await.unwrap(), "atxsj_abc");

        let empty = StaticTokenIssuer::default();
        assert!(matches!(
            empty.issue(&scope()).await,
            Err(FabricError::Config(_))
        ));
    }
}
