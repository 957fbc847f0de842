//! Wire types that travel through the pipeline's queues.
//!
//! Mirrors `internal/pkg/messages` of the original service: queue name
//! constants, the job message that rides Upload/Split/Synthesize/Join/Fail,
//! and the inform message that rides Inform.

use serde::{Deserialize, Serialize};

/// Queue name prefix shared by every queue this system declares.
pub const QUEUE_PREFIX: &str = "BigTTS/";

/// Named queues. `as_str` gives the fully-prefixed name used on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
	Upload,
	Split,
	Synthesize,
	Join,
	Fail,
	Inform,
}

impl Queue {
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Upload => "Upload",
			Self::Split => "Split",
			Self::Synthesize => "Synthesize",
			Self::Join => "Join",
			Self::Fail => "Fail",
			Self::Inform => "Inform",
		}
	}

	#[must_use]
	pub fn queue_name(self) -> String {
		format!("{QUEUE_PREFIX}{}", self.name())
	}
}

/// The job message that moves through Upload/Split/Synthesize/Join/Fail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobMessage {
	pub id: String,
	pub voice: String,
	pub speed: f64,
	#[serde(default)]
	pub save_request: bool,
	pub output_format: String,
	#[serde(default)]
	pub save_tags: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_id: Option<String>,
	/// populated only on the Fail queue
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl JobMessage {
	/// Builds a copy of `self` carrying `error`, the shape the coordinator
	/// publishes to the Fail queue for usage restoration.
	#[must_use]
	pub fn with_error(&self, error: impl Into<String>) -> Self {
		Self {
			error: Some(error.into()),
			..self.clone()
		}
	}
}

/// The three terminal/started notifications the Inform worker can send.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum InformType {
	Started,
	Finished,
	Failed,
}

impl InformType {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Started => "Started",
			Self::Finished => "Finished",
			Self::Failed => "Failed",
		}
	}
}

/// Message on the Inform queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InformMessage {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: InformType,
	/// always UTC; rendering may localize this, the wire value never does
	pub at: chrono::DateTime<chrono::Utc>,
	#[serde(default)]
	pub tags: Vec<String>,
}

/// Tag kinds attached to a saved request, mirrors `messages.TagsType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
	Undefined,
	Created,
	Filename,
	Voice,
	Speed,
}

impl TagKind {
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Undefined => "Undefined",
			Self::Created => "Created",
			Self::Filename => "Filename",
			Self::Voice => "Voice",
			Self::Speed => "Speed",
		}
	}

	#[must_use]
	pub fn from_name(s: &str) -> Self {
		match s {
			"Created" => Self::Created,
			"Filename" => Self::Filename,
			"Voice" => Self::Voice,
			"Speed" => Self::Speed,
			_ => Self::Undefined,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn queue_names_are_prefixed() {
		assert_eq!(Queue::Upload.queue_name(), "BigTTS/Upload");
		assert_eq!(Queue::Fail.queue_name(), "BigTTS/Fail");
		assert_eq!(Queue::Inform.queue_name(), "BigTTS/Inform");
	}

	#[test]
	fn with_error_preserves_other_fields() {
		let m = JobMessage {
			id: "id1".into(),
			voice: "astra".into(),
			speed: 1.0,
			save_request: true,
			output_format: "mp3".into(),
			save_tags: vec!["a".into()],
			request_id: Some("svc:manual:1".into()),
			error: None,
		};
		let failed = m.with_error("boom");
		assert_eq!(failed.error.as_deref(), Some("boom"));
		assert_eq!(failed.id, m.id);
		assert_eq!(failed.request_id, m.request_id);
	}

	#[test]
	fn job_message_roundtrips_through_json() {
		let m = JobMessage {
			id: "id1".into(),
			voice: "astra".into(),
			speed: 1.0,
			save_request: false,
			output_format: "mp3".into(),
			save_tags: vec![],
			request_id: None,
			error: None,
		};
		let s = serde_json::to_string(&m).unwrap();
		let back: JobMessage = serde_json::from_str(&s).unwrap();
		assert_eq!(m, back);
	}

	#[test]
	fn inform_message_serializes_type_as_pascal_case() {
		let m = InformMessage {
			id: "id1".into(),
			kind: InformType::Finished,
			at: chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
			tags: vec![],
		};
		let v: serde_json::Value = serde_json::to_value(&m).unwrap();
		assert_eq!(v["type"], "Finished");
	}

	#[test]
	fn tag_kind_from_name_roundtrips() {
		for k in [TagKind::Created, TagKind::Filename, TagKind::Voice, TagKind::Speed] {
			assert_eq!(TagKind::from_name(k.name()), k);
		}
	}
}
