use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::token::RegistrationPayload;
use service_core::error::AppError;

/// Outbound notifications around the onboarding flow. Delivery internals are
/// the collaborator's problem; the service only hands over the payload and,
/// for the admin request, the two pre-built links.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_approval_request(
        &self,
        payload: &RegistrationPayload,
        approve_url: &str,
        deny_url: &str,
    ) -> Result<(), AppError>;

    async fn send_welcome(&self, payload: &RegistrationPayload) -> Result<(), AppError>;

    async fn send_denial(&self, payload: &RegistrationPayload) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailNotifier {
    mailer: SmtpTransport,
    from_email: String,
    admin_email: String,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email notifier initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
            admin_email: config.admin_email.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send in the blocking pool to keep the async runtime free.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_approval_request(
        &self,
        payload: &RegistrationPayload,
        approve_url: &str,
        deny_url: &str,
    ) -> Result<(), AppError> {
        let subject = format!("CLI access request: {}", payload.username);

        let plain_body = format!(
            "New CLI access registration.\n\n\
             Username: {}\nName: {}\nEmail: {}\nSubmitted: {}\n\n\
             Approve: {}\nDeny: {}\n\n\
             The links expire on {}.",
            payload.username,
            payload.display_name(),
            payload.email,
            payload.submitted_at.format("%Y-%m-%d %H:%M:%S UTC"),
            approve_url,
            deny_url,
            payload.expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        let html_body = format!(
            r#"<html><body style="font-family: Arial, sans-serif;">
<h2>New CLI access registration</h2>
<p><strong>Username:</strong> {}<br>
<strong>Name:</strong> {}<br>
<strong>Email:</strong> {}</p>
<p>
  <a href="{}" style="background:#28a745;color:#fff;padding:10px 20px;text-decoration:none;border-radius:4px;">Approve</a>
  &nbsp;
  <a href="{}" style="background:#dc3545;color:#fff;padding:10px 20px;text-decoration:none;border-radius:4px;">Deny</a>
</p>
<p>The links expire on {}.</p>
</body></html>"#,
            payload.username,
            payload.display_name(),
            payload.email,
            approve_url,
            deny_url,
            payload.expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        self.send_email(&self.admin_email, &subject, &plain_body, &html_body)
            .await
    }

    async fn send_welcome(&self, payload: &RegistrationPayload) -> Result<(), AppError> {
        let plain_body = format!(
            "Hi {},\n\n\
             Your CLI access registration has been approved. You will receive a \
             separate email to set your password.\n\n\
             Once that is done, run the access CLI to log in and fetch \
             credentials.",
            payload.first_name,
        );

        let html_body = format!(
            r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Welcome, {}!</h2>
<p>Your CLI access registration has been approved. You will receive a separate
email to set your password.</p>
<p>Once that is done, run the access CLI to log in and fetch credentials.</p>
</body></html>"#,
            payload.first_name,
        );

        self.send_email(
            &payload.email,
            "Your CLI access has been approved",
            &plain_body,
            &html_body,
        )
        .await
    }

    async fn send_denial(&self, payload: &RegistrationPayload) -> Result<(), AppError> {
        let plain_body = format!(
            "Hi {},\n\n\
             Your CLI access registration was not approved. If you believe this \
             is a mistake, contact your administrator.",
            payload.first_name,
        );

        let html_body = format!(
            r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Registration not approved</h2>
<p>Hi {},</p>
<p>Your CLI access registration was not approved. If you believe this is a
mistake, contact your administrator.</p>
</body></html>"#,
            payload.first_name,
        );

        self.send_email(
            &payload.email,
            "Your CLI access registration",
            &plain_body,
            &html_body,
        )
        .await
    }
}

/// What a mock notifier recorded, for assertions.
#[derive(Debug, Clone)]
pub enum SentMessage {
    ApprovalRequest {
        username: String,
        approve_url: String,
        deny_url: String,
    },
    Welcome {
        username: String,
    },
    Denial {
        username: String,
    },
}

/// Recording notifier for tests.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentMessage>>,
    fail_approval_request: AtomicBool,
    fail_welcome: AtomicBool,
    fail_denial: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_approval_request(&self, fail: bool) {
        self.fail_approval_request.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_welcome(&self, fail: bool) {
        self.fail_welcome.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_denial(&self, fail: bool) {
        self.fail_denial.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_approval_request(
        &self,
        payload: &RegistrationPayload,
        approve_url: &str,
        deny_url: &str,
    ) -> Result<(), AppError> {
        if self.fail_approval_request.load(Ordering::SeqCst) {
            return Err(AppError::EmailError("SMTP unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage::ApprovalRequest {
            username: payload.username.clone(),
            approve_url: approve_url.to_string(),
            deny_url: deny_url.to_string(),
        });
        Ok(())
    }

    async fn send_welcome(&self, payload: &RegistrationPayload) -> Result<(), AppError> {
        if self.fail_welcome.load(Ordering::SeqCst) {
            return Err(AppError::EmailError("SMTP unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage::Welcome {
            username: payload.username.clone(),
        });
        Ok(())
    }

    async fn send_denial(&self, payload: &RegistrationPayload) -> Result<(), AppError> {
        if self.fail_denial.load(Ordering::SeqCst) {
            return Err(AppError::EmailError("SMTP unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage::Denial {
            username: payload.username.clone(),
        });
        Ok(())
    }
}
