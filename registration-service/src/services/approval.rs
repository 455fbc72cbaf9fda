use std::sync::Arc;

use crate::services::{Directory, Notifier, ServiceError};
use crate::token::{Action, RegistrationPayload, TokenCodec};

/// Terminal outcome of an approval click.
#[derive(Debug)]
pub enum ApprovalOutcome {
    Created { payload: RegistrationPayload },
    AlreadyExists { payload: RegistrationPayload },
}

/// Handles one approval or denial click end to end.
///
/// Approvals are idempotent through the directory lookup: a repeated click on
/// the same link reports "already exists" instead of re-creating. The
/// lookup-then-create pair is not atomic, so two near-simultaneous clicks can
/// race; the loser's create fails in the directory and is reported to the
/// operator. If the user is created but the group assignment fails, the user
/// is left in place for manual cleanup; there is no rollback.
#[derive(Clone)]
pub struct ApprovalService {
    codec: TokenCodec,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn Notifier>,
    group_id: String,
}

impl ApprovalService {
    pub fn new(
        codec: TokenCodec,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
        group_id: String,
    ) -> Self {
        Self {
            codec,
            directory,
            notifier,
            group_id,
        }
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn approve(&self, token: &str) -> Result<ApprovalOutcome, ServiceError> {
        let payload = self.codec.decode(token, Action::Approve)?;

        if let Some(existing) = self
            .directory
            .lookup_user(&payload.username)
            .await
            .map_err(ServiceError::Directory)?
        {
            tracing::info!(
                username = %payload.username,
                user_id = %existing.user_id,
                "Approval replayed, user already exists"
            );
            return Ok(ApprovalOutcome::AlreadyExists { payload });
        }

        let user_id = self
            .directory
            .create_user(&payload)
            .await
            .map_err(ServiceError::Directory)?;

        self.directory
            .add_to_group(&user_id, &self.group_id)
            .await
            .map_err(ServiceError::Directory)?;

        // The user exists either way; a lost welcome email is not worth
        // failing the approval over.
        if let Err(e) = self.notifier.send_welcome(&payload).await {
            tracing::warn!(
                username = %payload.username,
                error = %e,
                "Welcome notification failed"
            );
        }

        tracing::info!(
            username = %payload.username,
            user_id = %user_id,
            group_id = %self.group_id,
            "User created and added to group"
        );

        Ok(ApprovalOutcome::Created { payload })
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn deny(&self, token: &str) -> Result<RegistrationPayload, ServiceError> {
        let payload = self.codec.decode(token, Action::Deny)?;

        if let Err(e) = self.notifier.send_denial(&payload).await {
            tracing::warn!(
                username = %payload.username,
                error = %e,
                "Denial notification failed"
            );
        }

        tracing::info!(username = %payload.username, "Registration denied");

        Ok(payload)
    }
}
