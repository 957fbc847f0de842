//! Email rendering (`EmailMaker` in the original): given `{ID, type, local
//! time, email}`, produce a subject/body pair. The spec leaves concrete
//! template rendering an external collaborator (§1); this ships the
//! minimal text template the teacher's thin adapters would fill in from a
//! configured template file.

use bigtts_messages::InformType;
use chrono::DateTime;
use chrono_tz::Tz;

/// A fully rendered, ready-to-send email.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
	pub to: String,
	pub subject: String,
	pub body: String,
}

/// Dynamic-dispatch seam (§9 design note) over email rendering.
pub trait EmailTemplater: Send + Sync {
	fn render(&self, id: &str, kind: InformType, local_time: DateTime<Tz>, email: &str) -> RenderedEmail;
}

/// Plain-text template, one fixed body per `InformType`. A real deployment
/// swaps this for a file-backed template renderer; the shape (subject line
/// naming the ID, body naming the local timestamp) matches what the
/// original's `inform.Data` struct carries into its Go template.
pub struct TemplateEmailMaker {
	pub service_name: String,
}

impl TemplateEmailMaker {
	#[must_use]
	pub fn new(service_name: impl Into<String>) -> Self {
		Self { service_name: service_name.into() }
	}
}

impl EmailTemplater for TemplateEmailMaker {
	fn render(&self, id: &str, kind: InformType, local_time: DateTime<Tz>, email: &str) -> RenderedEmail {
		let formatted_time = local_time.format("%Y-%m-%d %H:%M:%S %Z");
		let subject = format!("{} request {id}: {}", self.service_name, kind.as_str());
		let body = match kind {
			InformType::Started => format!("Your request {id} started processing at {formatted_time}."),
			InformType::Finished => format!("Your request {id} finished at {formatted_time}. The result is ready for download."),
			InformType::Failed => format!("Your request {id} failed at {formatted_time}. Please try again or contact support."),
		};
		RenderedEmail { to: email.to_string(), subject, body }
	}
}
