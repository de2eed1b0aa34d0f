use resend_rs::{Resend, types::CreateEmailBaseOptions};

use crate::{config::EmailConfig, errors::AppError};

/// Sends verification codes through Resend, or logs them when no API key is set
#[derive(Clone)]
pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub async fn send_verification_code(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        let Some(api_key) = self.config.resend_api_key.as_deref() else {
            tracing::warn!(
                "RESEND_API_KEY not set; verification code for {} is {}",
                to_email,
                code
            );
            return Ok(());
        };

        let resend = Resend::new(api_key);
        let to = [to_email];
        let html = verification_html(code);
        let email = CreateEmailBaseOptions::new(
            self.config.from.as_str(),
            to,
            "Tu código de verificación de SmartCity",
        )
        .with_html(&html);

        resend.emails.send(email).await.map_err(|e| {
            tracing::error!("Failed to send verification email: {:?}", e);
            AppError::InternalError("Failed to send verification email".to_string())
        })?;

        tracing::info!("Verification email sent to {}", to_email);
        Ok(())
    }
}

fn verification_html(code: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h1>SmartCity</h1>
        <h2>Verifica tu correo electrónico</h2>
        <p>Usa este código para confirmar tu cuenta:</p>
        <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px;">{}</p>
        <p>El código vence en <strong>10 minutos</strong>.</p>
        <p>Si no creaste una cuenta, ignora este mensaje.</p>
    </div>
</body>
</html>"#,
        code
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_contains_code() {
        assert!(verification_html("482913").contains("482913"));
    }

    #[tokio::test]
    async fn without_api_key_sending_succeeds() {
        let mailer = Mailer::new(EmailConfig {
            resend_api_key: None,
            from: "SmartCity <onboarding@resend.dev>".to_string(),
        });
        assert!(
            mailer
                .send_verification_code("maria@example.com", "123456")
                .await
                .is_ok()
        );
    }
}
