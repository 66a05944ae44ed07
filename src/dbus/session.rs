//! `org.freedesktop.Secret.Session`.

use super::SecretError;
use crate::core::service::Service;
use crate::core::types::SessionId;

pub struct SessionInterface {
    service: Service,
    id: SessionId,
}

impl SessionInterface {
    pub fn new(service: Service, id: SessionId) -> Self {
        Self { service, id }
    }
}

#[zbus::interface(name = "org.freedesktop.Secret.Session")]
impl SessionInterface {
    async fn close(&self) -> Result<(), SecretError> {
        self.service.close_session(&self.id).await?;
        Ok(())
    }
}
