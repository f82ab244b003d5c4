use std::sync::Arc;

use opticontrol_config::Settings;
use opticontrol_context::SessionStore;
use opticontrol_core::{ChatBackend, ChatService, TokenSigner, UserDirectory};
use opticontrol_providers::{WebhookClient, WebhookError};

/// Shared state behind every handler.
#[derive(Debug)]
pub struct AppState {
    pub users: UserDirectory,
    pub signer: TokenSigner,
    pub chat: ChatService,
    /// Adds `Secure` to the auth cookie.
    pub secure_cookies: bool,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    #[must_use]
    pub fn new(
        users: UserDirectory,
        signer: TokenSigner,
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn SessionStore>,
        secure_cookies: bool,
    ) -> Self {
        Self {
            users,
            signer,
            chat: ChatService::new(backend, store),
            secure_cookies,
        }
    }

    /// Wire the real webhook client from resolved settings.
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, WebhookError> {
        let client = WebhookClient::from_settings(&settings.webhook)?;
        Ok(Self::new(
            UserDirectory::from_config(&settings.users),
            TokenSigner::from_settings(&settings.auth),
            Arc::new(client),
            store,
            settings.server.production,
        ))
    }
}
