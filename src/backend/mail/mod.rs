/**
 * Proposal Email
 *
 * Submitting a procurement proposal sends the client an email with the
 * offer summary, optionally copying additional addresses. Sending happens
 * after the submission commits and a failure is only logged; the proposal
 * itself never depends on the mail relay being up.
 */

use async_trait::async_trait;
use lettre::{
    message::Mailbox,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::shared::cases::Procurement;
use crate::shared::error::{CoreError, CoreResult};

/// Sends the proposal summary for a procurement case.
#[async_trait]
pub trait ProposalMailer: Send + Sync {
    /// Deliver the proposal to the client address, copying `cc`.
    async fn send_proposal(
        &self,
        procurement: &Procurement,
        to: &str,
        cc: &[String],
    ) -> CoreResult<()>;
}

fn proposal_subject(procurement: &Procurement) -> String {
    format!("Proposal for \"{}\"", procurement.title)
}

fn proposal_body(procurement: &Procurement) -> String {
    let amount = procurement.proposal_amount_cents as f64 / 100.0;
    let mut body = format!(
        "A proposal has been submitted for \"{}\".\n\nAmount: {:.2} {}\n",
        procurement.title, amount, procurement.proposal_currency
    );
    if let Some(file_ref) = &procurement.proposal_file_ref {
        body.push_str(&format!("Attachment reference: {file_ref}\n"));
    }
    body
}

/// Mailer over an authenticated SMTP relay (lettre, tokio transport).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a relay transport. Fails when the host or from-address is
    /// malformed, so misconfiguration surfaces at startup instead of on the
    /// first proposal.
    pub fn new(host: &str, username: &str, password: &str, from: &str) -> CoreResult<Self> {
        let from = from
            .parse::<Mailbox>()
            .map_err(|err| CoreError::upstream(format!("invalid SMTP from address: {err}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|err| CoreError::upstream(format!("SMTP relay setup failed: {err}")))?
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl ProposalMailer for SmtpMailer {
    async fn send_proposal(
        &self,
        procurement: &Procurement,
        to: &str,
        cc: &[String],
    ) -> CoreResult<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|err| CoreError::upstream(format!("invalid recipient address: {err}")))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(proposal_subject(procurement));

        for address in cc {
            match address.parse::<Mailbox>() {
                Ok(mailbox) => builder = builder.cc(mailbox),
                Err(err) => {
                    tracing::warn!("Skipping malformed cc address {}: {}", address, err);
                }
            }
        }

        let email = builder
            .body(proposal_body(procurement))
            .map_err(|err| CoreError::upstream(format!("building proposal email: {err}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|err| CoreError::upstream(format!("SMTP send failed: {err}")))?;

        Ok(())
    }
}

/// Fallback when no SMTP relay is configured: log what would have been sent.
pub struct LogMailer;

#[async_trait]
impl ProposalMailer for LogMailer {
    async fn send_proposal(
        &self,
        procurement: &Procurement,
        to: &str,
        cc: &[String],
    ) -> CoreResult<()> {
        tracing::info!(
            "Proposal email (no SMTP configured) to {} cc {:?}: {}",
            to,
            cc,
            proposal_subject(procurement)
        );
        Ok(())
    }
}
