use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::{config::SmtpConfig, include_res, render_markdown};

/// Everything the collaborator invitation mail talks about.
#[derive(Debug, Clone)]
pub struct InvitationMail {
    pub to_name: String,
    pub to_email: String,
    pub inviter_name: String,
    pub mod_name: String,
    pub role: String,
    pub invite_url: String,
}

impl InvitationMail {
    /// The display name is kept verbatim; lettre quotes it when encoding.
    pub fn recipient(&self) -> anyhow::Result<Mailbox> {
        let address: Address = self
            .to_email
            .parse()
            .with_context(|| format!("invalid recipient {}", self.to_email))?;
        Ok(Mailbox::new(Some(self.to_name.clone()), address))
    }

    pub fn subject(&self) -> String {
        format!("You've been invited to collaborate on {}", self.mod_name)
    }

    pub fn html_body(&self) -> String {
        let markdown = include_res!(str, "/mail/invitation.md")
            .replace("{collaborator}", &self.to_name)
            .replace("{inviter}", &self.inviter_name)
            .replace("{mod_name}", &self.mod_name)
            .replace("{role}", &self.role)
            .replace("{invite_url}", &self.invite_url);
        render_markdown(&markdown)
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(&self, mail: &InvitationMail) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let from: Mailbox = config.from.parse().with_context(|| format!("MAIL_FROM is not a mailbox: {}", config.from))?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_invitation(&self, mail: &InvitationMail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.recipient()?)
            .subject(mail.subject())
            .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(mail.html_body()))?;
        self.transport.send(message).await?;
        tracing::info!("invitation to {} mailed to {}", mail.mod_name, mail.to_email);
        Ok(())
    }
}

/// Used when no SMTP relay is configured: the accept link only shows up in the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(&self, mail: &InvitationMail) -> anyhow::Result<()> {
        tracing::info!(
            "not mailing {} (no SMTP configured): {} -> {}",
            mail.to_email,
            mail.subject(),
            mail.invite_url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_mail_mentions_the_link() {
        let mail = InvitationMail {
            to_name: "Ada".to_owned(),
            to_email: "ada@example.com".to_owned(),
            inviter_name: "Grace".to_owned(),
            mod_name: "Better Lanterns".to_owned(),
            role: "editor".to_owned(),
            invite_url: "http://localhost:8080/invitations/abc".to_owned(),
        };
        assert_eq!(mail.subject(), "You've been invited to collaborate on Better Lanterns");
        let body = mail.html_body();
        assert!(body.contains("http://localhost:8080/invitations/abc"));
        assert!(body.contains("Grace"));
    }

    #[test]
    fn recipient_names_may_hold_punctuation() {
        let mail = InvitationMail {
            to_name: r#"Lovelace, Ada "Countess""#.to_owned(),
            to_email: "ada@example.com".to_owned(),
            inviter_name: "Grace".to_owned(),
            mod_name: "Lanterns".to_owned(),
            role: "viewer".to_owned(),
            invite_url: "http://localhost:8080/invitations/abc".to_owned(),
        };
        let to = mail.recipient().unwrap();
        assert_eq!(to.name.as_deref(), Some(r#"Lovelace, Ada "Countess""#));
        assert_eq!(to.email.to_string(), "ada@example.com");

        let bad = InvitationMail { to_email: "not an address".to_owned(), ..mail };
        assert!(bad.recipient().is_err());
    }
}
