//! Sign-in and sign-out.

use portal_models::{LoginRequest, PersistMode, SessionUser, TokenGrant};
use tracing::info;

use crate::client::{error_for_status, GatewayClient};
use crate::error::SdkError;
use crate::request::{RequestOptions, SendOptions};
use crate::routes::ApiRoutes;

/// Login/logout over a [`GatewayClient`]'s credential store.
#[derive(Clone)]
pub struct Session {
    client: GatewayClient,
}

impl Session {
    pub fn new(client: &GatewayClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Exchange email and password for a credential pair.
    ///
    /// The pair lands in the scopes chosen by `persist`; every subscriber
    /// of the store (the notification poller among them) is woken.  A
    /// wrong password is an [`SdkError::Status`] carrying the server's
    /// message, and never triggers a renewal.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        persist: PersistMode,
    ) -> Result<Option<SessionUser>, SdkError> {
        let options = RequestOptions::post().json(&LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        })?;
        let response = self
            .client
            .send(ApiRoutes::LOGIN, options, SendOptions::without_refresh())
            .await?;
        let response = error_for_status(response).await?;

        let grant: TokenGrant = serde_json::from_slice(&response.bytes().await?)?;
        let pair = grant.credentials()?;
        self.client.credentials().set(&pair, persist);

        info!(%email, %persist, "signed in");
        Ok(grant.user)
    }

    /// Drop both tokens from both scopes.
    pub fn logout(&self) {
        self.client.credentials().clear();
        info!("signed out");
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.credentials().is_authenticated()
    }
}
