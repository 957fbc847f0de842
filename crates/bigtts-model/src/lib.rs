//! Persisted data model: `Request`, `Status`, `EmailLock`, and the shared
//! error-classification used by the retry policy (§3, §7 of the spec).

use serde::{Deserialize, Serialize};

/// A request's upload-time metadata. Created once by the upload boundary,
/// never mutated by the core pipeline (only extended once with the
/// filename at creation time).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
	pub id: String,
	pub voice: String,
	pub speed: f64,
	pub output_format: OutputFormat,
	pub save_request: bool,
	pub save_tags: Vec<String>,
	pub email: Option<String>,
	pub uploaded_filename: Option<String>,
	pub created_at: chrono::DateTime<chrono::Utc>,
	/// `service:manual:opaque`, when the upload originated upstream.
	pub request_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
	Mp3,
	M4a,
}

impl OutputFormat {
	#[must_use]
	pub const fn extension(self) -> &'static str {
		match self {
			Self::Mp3 => "mp3",
			Self::M4a => "m4a",
		}
	}

	#[must_use]
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"mp3" => Some(Self::Mp3),
			"m4a" => Some(Self::M4a),
			_ => None,
		}
	}
}

/// Pipeline stage, ordered as the spec's state machine progresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
	Uploaded,
	Split,
	Synthesize,
	Join,
	Completed,
}

impl Stage {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Uploaded => "UPLOADED",
			Self::Split => "Split",
			Self::Synthesize => "Synthesize",
			Self::Join => "Join",
			Self::Completed => "COMPLETED",
		}
	}

	#[must_use]
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"UPLOADED" => Some(Self::Uploaded),
			"Split" => Some(Self::Split),
			"Synthesize" => Some(Self::Synthesize),
			"Join" => Some(Self::Join),
			"COMPLETED" => Some(Self::Completed),
			_ => None,
		}
	}
}

/// The status row's two mutually-exclusive readings: "progressing at stage
/// X" or "failed with E". Modeled as a sum type rather than two optional
/// fields so the invariant in §3 is structurally enforced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StatusValue {
	Stage(Stage),
	Error(String),
}

/// The full status row for an ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Status {
	pub id: String,
	pub value: StatusValue,
}

impl Status {
	#[must_use]
	pub fn at_stage(id: impl Into<String>, stage: Stage) -> Self {
		Self { id: id.into(), value: StatusValue::Stage(stage) }
	}

	#[must_use]
	pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
		Self { id: id.into(), value: StatusValue::Error(error.into()) }
	}

	#[must_use]
	pub fn stage(&self) -> Option<Stage> {
		match &self.value {
			StatusValue::Stage(s) => Some(*s),
			StatusValue::Error(_) => None,
		}
	}

	#[must_use]
	pub fn error(&self) -> Option<&str> {
		match &self.value {
			StatusValue::Error(e) => Some(e.as_str()),
			StatusValue::Stage(_) => None,
		}
	}
}

/// State of an (id, type) email lock row. `Acquired` (0) means claimed but
/// not yet delivered; `Sent` (2) means delivered and must never be resent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(i32)]
pub enum EmailLockState {
	Acquired = 0,
	Sent = 2,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailLock {
	pub id: String,
	pub kind: String,
	pub state: EmailLockState,
}

/// Error-taxonomy marker from §7, threaded through synthesizer/coordinator
/// so the retry policy can decide requeue vs. terminal-restorable vs.
/// terminal-non-restorable without re-deriving it from string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
	/// network blip, store hiccup, 5xx remote — safe to requeue once.
	Transient,
	/// not retryable at this stage, but upstream usage should be restored.
	TerminalRestorable,
	/// not retryable, and usage must not be restored (e.g. remote 4xx).
	TerminalNonRestorable,
}

impl ErrorClass {
	#[must_use]
	pub const fn is_redeliverable(self) -> bool {
		matches!(self, Self::Transient)
	}

	/// Restorable and redeliverable are orthogonal (§7): a `Transient` error
	/// that has exhausted its one retry is still restorable when it goes
	/// terminal, since nothing about it was the caller's fault. Only
	/// `TerminalNonRestorable` (remote 4xx, malformed job) must not trigger
	/// a usage restore.
	#[must_use]
	pub const fn is_restorable(self) -> bool {
		!matches!(self, Self::TerminalNonRestorable)
	}
}
