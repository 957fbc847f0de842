//! Email transport (`Sender` in the original). The spec names SMTP
//! transport an external collaborator specified only by contract (§1);
//! this ships a `lettre`-backed adapter consistent with the workspace's
//! dependency table.

use crate::template::RenderedEmail;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SendError {
	#[error("can't build email: {0}")]
	Build(String),
	#[error("can't send email: {0}")]
	Transport(String),
}

/// Dynamic-dispatch seam (§9 design note) over email sending.
#[async_trait]
pub trait EmailSender: Send + Sync {
	async fn send(&self, email: &RenderedEmail) -> Result<(), SendError>;
}

pub struct LettreSender {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from: Mailbox,
}

impl LettreSender {
	/// # Errors
	/// Returns an error if `from` isn't a valid mailbox or the SMTP
	/// transport can't be built for `host`.
	pub fn new(host: &str, port: u16, user: Option<&str>, pass: Option<&str>, from: &str) -> Result<Self, SendError> {
		let from = from.parse().map_err(|e| SendError::Build(format!("invalid from address: {e}")))?;
		let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
		if let (Some(user), Some(pass)) = (user, pass) {
			builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
		}
		Ok(Self { transport: builder.build(), from })
	}
}

#[async_trait]
impl EmailSender for LettreSender {
	async fn send(&self, email: &RenderedEmail) -> Result<(), SendError> {
		let to: Mailbox = email.to.parse().map_err(|e| SendError::Build(format!("invalid to address: {e}")))?;
		let message = Message::builder()
			.from(self.from.clone())
			.to(to)
			.subject(&email.subject)
			.body(email.body.clone())
			.map_err(|e| SendError::Build(e.to_string()))?;
		self.transport.send(message).await.map_err(|e| SendError::Transport(e.to_string()))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_rejects_invalid_from_address() {
		let err = LettreSender::new("localhost", 25, None, None, "not-an-email");
		assert!(err.is_err());
	}
}
