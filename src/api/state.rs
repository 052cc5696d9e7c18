use std::sync::Arc;

use crate::{
    auth::AuthService, db::Cache, db::Repository, services::providers::MetadataProvider,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub cache: Cache,
    pub provider: Arc<dyn MetadataProvider>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        cache: Cache,
        provider: Arc<dyn MetadataProvider>,
        auth: AuthService,
    ) -> Self {
        Self {
            repo,
            cache,
            provider,
            auth: Arc::new(auth),
        }
    }
}
