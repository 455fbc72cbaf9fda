use chrono::Utc;
use std::sync::Arc;

use crate::dtos::RegisterRequest;
use crate::services::{Notifier, ServiceError};
use crate::token::{Action, RegistrationPayload, TokenCodec};

/// What one registration produced. The token pair is the only record of the
/// pending registration anywhere in the system.
#[derive(Debug)]
pub struct RegistrationReceipt {
    pub status: &'static str,
    pub approve_token: String,
    pub deny_token: String,
}

/// Takes a validated registration request, mints the approve/deny token pair
/// over one shared payload, and hands the resulting links to the notifier.
///
/// Nothing is persisted. If the admin notification is lost the registration
/// is unrecoverable, and the user simply resubmits; resubmission is harmless
/// because nothing dedupes at this stage.
#[derive(Clone)]
pub struct RegistrationService {
    codec: TokenCodec,
    notifier: Arc<dyn Notifier>,
    public_base_url: String,
}

impl RegistrationService {
    pub fn new(codec: TokenCodec, notifier: Arc<dyn Notifier>, public_base_url: String) -> Self {
        Self {
            codec,
            notifier,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[tracing::instrument(skip(self, req), fields(username = %req.username))]
    pub async fn register(
        &self,
        req: RegisterRequest,
    ) -> Result<RegistrationReceipt, ServiceError> {
        let payload = RegistrationPayload::new(
            req.username,
            req.email,
            req.first_name,
            req.last_name,
            Utc::now(),
        );

        let approve_token = self.codec.encode(&payload, Action::Approve)?;
        let deny_token = self.codec.encode(&payload, Action::Deny)?;

        let approve_url = format!("{}/approve?token={}", self.public_base_url, approve_token);
        let deny_url = format!("{}/deny?token={}", self.public_base_url, deny_token);

        self.notifier
            .send_approval_request(&payload, &approve_url, &deny_url)
            .await
            .map_err(|e| ServiceError::Email(e.to_string()))?;

        tracing::info!(
            username = %payload.username,
            expires_at = %payload.expires_at,
            "Registration submitted for approval"
        );

        Ok(RegistrationReceipt {
            status: "pending_approval",
            approve_token,
            deny_token,
        })
    }
}
