use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound mail abstraction. The auth flows only hand over a recipient and a
/// reset link; rendering and transport live behind this trait.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, name: &str, reset_url: &str)
        -> anyhow::Result<()>;
}

/// Dev fallback that logs instead of sending. Used when SMTP is not configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> anyhow::Result<()> {
        info!(to = %to, name = %name, url = %reset_url, "password reset email (log only)");
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        let from: Mailbox = cfg.from.parse()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> anyhow::Result<()> {
        let body = format!(
            "Hi {name},\n\n\
             Forgot your password? Submit a PATCH request with your new password to:\n\n\
             {reset_url}\n\n\
             The link is valid for a short time only. If you didn't request a password \
             reset, you can ignore this email.\n"
        );
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject("Your password reset link")
            .body(body)?;
        self.transport.send(message).await?;
        info!(to = %to, "password reset email sent");
        Ok(())
    }
}

/// Reset link embedded in outbound emails.
pub fn reset_url(public_base_url: &str, token: &str) -> String {
    let base = public_base_url.trim_end_matches('/');
    format!("{base}/api/v1/users/reset-password/{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_url_trims_trailing_slash() {
        assert_eq!(
            reset_url("https://api.example.com/", "abc123"),
            "https://api.example.com/api/v1/users/reset-password/abc123"
        );
        assert_eq!(
            reset_url("http://localhost:8080", "t"),
            "http://localhost:8080/api/v1/users/reset-password/t"
        );
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        mailer
            .send_password_reset("a@x.com", "Ada", "http://localhost/reset/t")
            .await
            .expect("log mailer should not fail");
    }
}
