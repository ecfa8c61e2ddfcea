use std::sync::Arc;

use async_trait::async_trait;

use crate::application::contact::ContactService;
use crate::application::resources::ResourceService;
use crate::infra::db::PostgresRepositories;
use crate::infra::error::InfraError;

use super::auth::AdminTokens;
use super::rate_limit::ApiRateLimiter;

/// Readiness probe for the backing store.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> Result<(), InfraError>;
}

#[async_trait]
impl HealthCheck for PostgresRepositories {
    async fn check(&self) -> Result<(), InfraError> {
        self.health_check().await.map_err(InfraError::from)
    }
}

#[derive(Clone)]
pub struct HttpState {
    pub resources: Arc<ResourceService>,
    pub contacts: Arc<ContactService>,
    pub health: Arc<dyn HealthCheck>,
    pub admin_tokens: Arc<AdminTokens>,
    pub rate_limiter: Arc<ApiRateLimiter>,
}
