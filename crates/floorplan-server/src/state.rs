//! Shared application state.

use crate::db::Database;
use crate::identity::{HeaderIdentity, IdentityProvider};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Empty database, identity taken from `user_header`.
    pub fn new(user_header: &str) -> Self {
        Self::with_identity(Arc::new(HeaderIdentity::new(user_header)))
    }

    pub fn with_identity(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            db: Arc::new(Database::new()),
            identity,
        }
    }
}
