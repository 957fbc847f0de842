//! Process configuration, one `clap::Parser` struct covering every key
//! enumerated in the spec's environment table (§6), following
//! `task_queue::config::Config`'s `new`/`test` convention.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
	#[error("path template {0:?} is missing the {{}} ID placeholder")]
	MissingIdPlaceholder(String),
}

/// `type` config key: which cleanup strategy `apps/bigtts-cleaner` runs.
#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CleanerMode {
	Db,
	Dir,
}

#[derive(Parser, Clone, Debug, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
pub struct Config {
	/// Use JSON formatting for tracing output.
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// `RUST_LOG`-style filter directive.
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,

	/// HTTP port for the service's own `/live`, `/metrics`, and any routes
	/// it owns (upload/status/result/clean).
	#[arg(long, env = "PORT", default_value = "8000")]
	pub port: u16,

	/// Request/Status/EmailLock store connection URL. Named `mongo.url` in
	/// the spec's env table; this build backs the store with Redis hashes
	/// (see `bigtts-store`), so the URL is a `redis://` URL — see
	/// `DESIGN.md` for the naming rationale.
	#[arg(long, env = "MONGO_URL", default_value = "redis://127.0.0.1/")]
	pub store_url: String,

	/// Message bus connection URL (`messageServer.url`).
	#[arg(long, env = "MESSAGE_SERVER_URL", default_value = "redis://127.0.0.1/")]
	pub message_server_url: String,

	/// `messageServer.user` / `messageServer.pass` — unused by the Redis
	/// bus adapter but accepted so deployments that set them don't fail
	/// config parsing.
	#[arg(long, env = "MESSAGE_SERVER_USER")]
	pub message_server_user: Option<String>,
	#[arg(long, env = "MESSAGE_SERVER_PASS")]
	pub message_server_pass: Option<String>,

	/// `fileStorage.path` — storage root the Cleaner's directory mode scans
	/// for stale top-level ID directories.
	#[arg(long, env = "FILE_STORAGE_PATH", default_value = "/data")]
	pub file_storage_path: String,

	/// `fileStorage.patterns` — `{ID}`-templated path patterns the Cleaner
	/// deletes in directory mode, comma separated.
	#[arg(long, env = "FILE_STORAGE_PATTERNS", value_delimiter = ',')]
	pub file_storage_patterns: Vec<String>,

	/// `synthesizer.URL` — remote per-chunk synthesis endpoint.
	#[arg(long, env = "SYNTHESIZER_URL")]
	pub synthesizer_url: String,

	/// `synthesizer.workers` — bound on in-flight remote synthesis calls.
	#[arg(long, env = "SYNTHESIZER_WORKERS", default_value = "5")]
	pub synthesizer_workers: usize,

	/// `synthesizer.outTemplate` — `{}`=ID templated directory for
	/// `NNNN.<fmt>` outputs.
	#[arg(long, env = "SYNTHESIZER_OUT_TEMPLATE", default_value = "/data/synth-out/{}")]
	pub synthesizer_out_template: String,

	/// `splitter.inTemplate` — `{}`=ID templated path to the uploaded text.
	#[arg(long, env = "SPLITTER_IN_TEMPLATE", default_value = "/data/upload/{}.txt")]
	pub splitter_in_template: String,

	/// `splitter.outTemplate` — `{}`=ID templated directory for `NNNN.txt`
	/// chunk outputs.
	#[arg(long, env = "SPLITTER_OUT_TEMPLATE", default_value = "/data/split-out/{}")]
	pub splitter_out_template: String,

	/// `joiner.outTemplate` — `{}`=ID templated directory for the final
	/// `result.<fmt>`.
	#[arg(long, env = "JOINER_OUT_TEMPLATE", default_value = "/data/join-out/{}")]
	pub joiner_out_template: String,

	/// `joiner.workTemplate` — `{}`=ID templated work directory for
	/// `list.txt`.
	#[arg(long, env = "JOINER_WORK_TEMPLATE", default_value = "/data/work/{}")]
	pub joiner_work_template: String,

	/// `joiner.metadata` — `K=V,K=V` container metadata pairs passed to the
	/// concat tool; blank entries are dropped at parse time.
	#[arg(long, env = "JOINER_METADATA", default_value = "")]
	pub joiner_metadata: String,

	/// `synthesis.defaultFormat` — output format when upload omits one.
	#[arg(long, env = "SYNTHESIS_DEFAULT_FORMAT", default_value = "mp3")]
	pub synthesis_default_format: String,

	/// `synthesis.defaultVoice` — voice when upload omits one.
	#[arg(long, env = "SYNTHESIS_DEFAULT_VOICE", default_value = "astra")]
	pub synthesis_default_voice: String,

	/// `synthesis.voices` — the recognized voice set; uploads naming any
	/// other voice are rejected at the HTTP boundary (§8 scenario 4).
	#[arg(long, env = "SYNTHESIS_VOICES", value_delimiter = ',', default_value = "astra,aiva,amelija")]
	pub synthesis_voices: Vec<String>,

	/// `worker.taskName` — label this process's queue consumer logs and
	/// metrics under.
	#[arg(long, env = "WORKER_TASK_NAME", default_value = "bigtts")]
	pub worker_task_name: String,

	/// `worker.location` — IANA timezone name used only for the Inform
	/// worker's rendered local time (§9 open question: message `at` stays
	/// UTC, rendering may localize).
	#[arg(long, env = "WORKER_LOCATION", default_value = "UTC")]
	pub worker_location: String,

	/// `timer.runEvery` seconds — Cleaner's sweep interval.
	#[arg(long, env = "TIMER_RUN_EVERY_SECS", default_value = "3600", value_parser = parse_duration)]
	pub timer_run_every: Duration,

	/// `timer.expire` seconds — age past which a request is stale.
	#[arg(long, env = "TIMER_EXPIRE_SECS", default_value = "604800", value_parser = parse_duration)]
	pub timer_expire: Duration,

	/// `type` — `db` or `dir` Cleaner mode.
	#[arg(long, env = "TYPE", default_value = "db")]
	pub cleaner_mode: CleanerMode,

	/// `doorman.url` — admin/billing base URL the Usage Restorer posts to.
	#[arg(long, env = "DOORMAN_URL")]
	pub doorman_url: String,

	/// SMTP relay used by the Inform worker's email transport (ambient
	/// stack; `spec.md` §1 names SMTP transport an external collaborator
	/// specified only by contract).
	#[arg(long, env = "SMTP_HOST", default_value = "localhost")]
	pub smtp_host: String,
	#[arg(long, env = "SMTP_PORT", default_value = "25")]
	pub smtp_port: u16,
	#[arg(long, env = "SMTP_USER")]
	pub smtp_user: Option<String>,
	#[arg(long, env = "SMTP_PASS")]
	pub smtp_pass: Option<String>,
	#[arg(long, env = "SMTP_FROM", default_value = "noreply@bigtts.local")]
	pub smtp_from: String,
}

impl Config {
	#[must_use]
	pub fn new() -> Self {
		Self::parse()
	}

	/// Validates that every `{}`/`{ID}` templated path this config carries
	/// actually contains its placeholder, mirroring the original's
	/// `NewWorker` constructor checks (`splitter.Worker`/`joiner.Worker`).
	///
	/// # Errors
	/// Returns `ConfigError::MissingIdPlaceholder` naming the first
	/// offending template.
	pub fn validate_templates(&self) -> Result<(), ConfigError> {
		for (name, template) in [
			("splitter.inTemplate", &self.splitter_in_template),
			("splitter.outTemplate", &self.splitter_out_template),
			("synthesizer.outTemplate", &self.synthesizer_out_template),
			("joiner.outTemplate", &self.joiner_out_template),
			("joiner.workTemplate", &self.joiner_work_template),
		] {
			if !template.contains("{}") {
				return Err(ConfigError::MissingIdPlaceholder(name.to_string()));
			}
		}
		Ok(())
	}

	/// Parses `joiner.metadata`'s `K=V,K=V` form, dropping blank entries
	/// (§4.4: "blank entries are dropped") — a pair with an empty key or an
	/// empty value is blank.
	#[must_use]
	pub fn joiner_metadata_pairs(&self) -> Vec<(String, String)> {
		self.joiner_metadata
			.split(',')
			.filter_map(|pair| {
				let pair = pair.trim();
				if pair.is_empty() {
					return None;
				}
				let (k, v) = pair.split_once('=')?;
				let (k, v) = (k.trim(), v.trim());
				if k.is_empty() || v.is_empty() {
					return None;
				}
				Some((k.to_string(), v.to_string()))
			})
			.collect()
	}

	#[cfg(any(test, feature = "test-util"))]
	#[must_use]
	pub fn test() -> Self {
		Self {
			log_json: false,
			rust_log: None,
			port: 0,
			store_url: "redis://127.0.0.1/".into(),
			message_server_url: "redis://127.0.0.1/".into(),
			message_server_user: None,
			message_server_pass: None,
			file_storage_path: "/tmp/bigtts-test".into(),
			file_storage_patterns: vec!["upload/{ID}.txt".into()],
			synthesizer_url: "http://localhost:9999/synthesize".into(),
			synthesizer_workers: 2,
			synthesizer_out_template: "/tmp/bigtts-test/synth-out/{}".into(),
			splitter_in_template: "/tmp/bigtts-test/upload/{}.txt".into(),
			splitter_out_template: "/tmp/bigtts-test/split-out/{}".into(),
			joiner_out_template: "/tmp/bigtts-test/join-out/{}".into(),
			joiner_work_template: "/tmp/bigtts-test/work/{}".into(),
			joiner_metadata: String::new(),
			synthesis_default_format: "mp3".into(),
			synthesis_default_voice: "astra".into(),
			synthesis_voices: vec!["astra".into(), "aiva".into(), "amelija".into()],
			worker_task_name: "bigtts-test".into(),
			worker_location: "UTC".into(),
			timer_run_every: Duration::from_secs(1),
			timer_expire: Duration::from_secs(60),
			cleaner_mode: CleanerMode::Db,
			doorman_url: "http://localhost:9998".into(),
			smtp_host: "localhost".into(),
			smtp_port: 2525,
			smtp_user: None,
			smtp_pass: None,
			smtp_from: "noreply@bigtts.local".into(),
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self::test()
	}
}

fn parse_duration(s: &str) -> Result<Duration, std::num::ParseIntError> {
	s.parse::<u64>().map(Duration::from_secs)
}
