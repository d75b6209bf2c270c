//! Host-local call surface.
//!
//! On the device that owns the store there is no network hop: the same
//! [`Operations`] methods the remotes use run straight through the router's
//! execution step, broadcasts included. Screens never branch on role.

use crate::router::RequestRouter;
use piste_core::{Call, Operations, SyncError};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct LocalSession {
    router: Arc<RequestRouter>,
}

impl LocalSession {
    pub(crate) fn new(router: Arc<RequestRouter>) -> Self {
        Self { router }
    }
}

impl Operations for LocalSession {
    async fn call(&self, call: Call) -> Result<Value, SyncError> {
        self.router.execute_local(&call).await
    }
}
