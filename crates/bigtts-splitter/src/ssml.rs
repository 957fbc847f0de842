//! SSML segmentation (§4.2): parse a `<speak>` document into
//! `Text`/`Pause` parts, sub-split each `Text` with the plain-text
//! algorithm, and re-serialize each resulting chunk as its own `<speak>`
//! document.

use crate::plaintext::{split_plain_text, SplitError, INTERVAL, WANTED_CHARS};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SsmlError {
	#[error("xml parse error: {0}")]
	Xml(#[from] quick_xml::Error),
	#[error("{0}")]
	Split(#[from] SplitError),
	#[error("unclosed tag in document")]
	Unclosed,
}

/// One run of text inside a `Text` part: either plain prose or an accented
/// word override (`<intelektika:w acc="…" syll="…" user="…">text</…>`).
#[derive(Debug, Clone, PartialEq)]
pub enum TextPart {
	Plain(String),
	Word { text: String, acc: String, syll: String, user: String },
}

impl TextPart {
	fn plain_text(&self) -> &str {
		match self {
			Self::Plain(s) | Self::Word { text: s, .. } => s,
		}
	}
}

/// One part of the parsed document: a contiguous run of same-voice,
/// same-rate text, or a silence gap.
#[derive(Debug, Clone, PartialEq)]
pub enum SsmlPart {
	Text { voice: String, speed: f64, parts: Vec<TextPart> },
	Pause { duration_ms: u64 },
}

impl SsmlPart {
	fn rune_len(&self) -> usize {
		match self {
			Self::Text { parts, .. } => parts.iter().map(|p| p.plain_text().chars().count()).sum(),
			Self::Pause { .. } => 0,
		}
	}
}

/// Maps a clamped playback rate to the percentage the remote synthesizer
/// expects, monotone-decreasing in `r` (§8 law): `r>1 → 150−50r`,
/// `r<=1 → 300−200r`.
#[must_use]
pub fn to_rate_str(r: f64) -> String {
	let clamped = r.clamp(0.5, 2.0);
	let pct = if clamped > 1.0 { 150.0 - 50.0 * clamped } else { 300.0 - 200.0 * clamped };
	format!("{}%", pct.round() as i64)
}

/// Inverse of `to_rate_str`'s piecewise map, used when parsing an input
/// document's `<prosody rate="R%">` back into a numeric speed.
fn rate_attr_to_speed(attr: &str) -> Option<f64> {
	let pct: f64 = attr.trim().trim_end_matches('%').parse().ok()?;
	if pct < 100.0 {
		Some((150.0 - pct) / 50.0)
	} else {
		Some((300.0 - pct) / 200.0)
	}
}

fn attr_value(tag: &BytesStart, name: &[u8]) -> Option<String> {
	tag.attributes().filter_map(Result::ok).find(|a| a.key.as_ref() == name).and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

struct Frame {
	voice: Option<String>,
	speed: Option<f64>,
}

/// Parses `xml` into a sequence of `Text`/`Pause` parts.
///
/// # Errors
/// Returns `SsmlError::Xml` on malformed XML and `SsmlError::Unclosed` if
/// the document ends with open `<voice>`/`<prosody>` elements.
pub fn parse_ssml(xml: &str) -> Result<Vec<SsmlPart>, SsmlError> {
	let mut reader = Reader::from_str(xml);
	reader.config_mut().trim_text = false;

	let mut stack: Vec<Frame> = Vec::new();
	let mut parts = Vec::new();
	let mut current: Vec<TextPart> = Vec::new();
	let mut buf = Vec::new();

	let flush = |current: &mut Vec<TextPart>, parts: &mut Vec<SsmlPart>, stack: &[Frame]| {
		if current.is_empty() {
			return;
		}
		let voice = stack.iter().rev().find_map(|f| f.voice.clone()).unwrap_or_default();
		let speed = stack.iter().rev().find_map(|f| f.speed).unwrap_or(1.0);
		parts.push(SsmlPart::Text { voice, speed, parts: std::mem::take(current) });
	};

	loop {
		match reader.read_event_into(&mut buf)? {
			Event::Start(tag) => match tag.name().as_ref() {
				b"voice" => {
					flush(&mut current, &mut parts, &stack);
					stack.push(Frame { voice: attr_value(&tag, b"name"), speed: None });
				}
				b"prosody" => {
					flush(&mut current, &mut parts, &stack);
					let speed = attr_value(&tag, b"rate").and_then(|r| rate_attr_to_speed(&r));
					stack.push(Frame { voice: None, speed });
				}
				b"intelektika:w" => {
					let acc = attr_value(&tag, b"acc").unwrap_or_default();
					let syll = attr_value(&tag, b"syll").unwrap_or_default();
					let user = attr_value(&tag, b"user").unwrap_or_default();
					let text = read_element_text(&mut reader, &mut buf)?;
					current.push(TextPart::Word { text, acc, syll, user });
				}
				b"speak" => {}
				_ => {}
			},
			Event::Empty(tag) if tag.name().as_ref() == b"break" => {
				flush(&mut current, &mut parts, &stack);
				let ms = attr_value(&tag, b"time").and_then(|t| t.trim_end_matches("ms").parse().ok()).unwrap_or(0);
				parts.push(SsmlPart::Pause { duration_ms: ms });
			}
			Event::Text(text) => {
				let s = text.unescape()?.into_owned();
				if !s.is_empty() {
					current.push(TextPart::Plain(s));
				}
			}
			Event::End(tag) => match tag.name().as_ref() {
				b"voice" | b"prosody" => {
					flush(&mut current, &mut parts, &stack);
					stack.pop();
				}
				_ => {}
			},
			Event::Eof => break,
			_ => {}
		}
		buf.clear();
	}
	flush(&mut current, &mut parts, &stack);
	if !stack.is_empty() {
		return Err(SsmlError::Unclosed);
	}
	Ok(parts)
}

fn read_element_text(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<String, quick_xml::Error> {
	let mut text = String::new();
	loop {
		match reader.read_event_into(buf)? {
			Event::Text(t) => text.push_str(&t.unescape()?),
			Event::End(_) | Event::Eof => break,
			_ => {}
		}
	}
	Ok(text)
}

/// Sub-splits a `Text` part's plain content, emitting one `TextPart` list
/// per chunk that the plain-text algorithm would cut. A cut that lands
/// inside a `Word` override is pushed to the end of that word so markup is
/// never split mid-element.
fn split_text_parts(parts: &[TextPart], voice: &str, speed: f64) -> Result<Vec<SsmlPart>, SplitError> {
	let flat: String = parts.iter().map(TextPart::plain_text).collect();
	let chunk_lens: Vec<usize> = split_plain_text(&flat)?.iter().map(|c| c.chars().count()).collect();

	let mut out = Vec::new();
	let mut remaining_in_chunk = chunk_lens.first().copied().unwrap_or(0);
	let mut chunk_idx = 0usize;
	let mut current: Vec<TextPart> = Vec::new();

	for part in parts {
		let len = part.plain_text().chars().count();
		if len <= remaining_in_chunk || matches!(part, TextPart::Word { .. }) {
			// whole part fits, or it's atomic: never split a Word mid-element
			current.push(part.clone());
			remaining_in_chunk = remaining_in_chunk.saturating_sub(len);
		} else {
			let text = part.plain_text();
			let mut chars = text.chars();
			let head: String = chars.by_ref().take(remaining_in_chunk).collect();
			let tail: String = chars.collect();
			if !head.is_empty() {
				current.push(TextPart::Plain(head));
			}
			out.push(SsmlPart::Text { voice: voice.to_string(), speed, parts: std::mem::take(&mut current) });
			chunk_idx += 1;
			remaining_in_chunk = chunk_lens.get(chunk_idx).copied().unwrap_or(tail.chars().count());
			if !tail.is_empty() {
				current.push(TextPart::Plain(tail));
				remaining_in_chunk = remaining_in_chunk.saturating_sub(tail.chars().count().min(remaining_in_chunk));
			}
		}
		if remaining_in_chunk == 0 && !current.is_empty() {
			out.push(SsmlPart::Text { voice: voice.to_string(), speed, parts: std::mem::take(&mut current) });
			chunk_idx += 1;
			remaining_in_chunk = chunk_lens.get(chunk_idx).copied().unwrap_or(0);
		}
	}
	if !current.is_empty() {
		out.push(SsmlPart::Text { voice: voice.to_string(), speed, parts: current });
	}
	Ok(out)
}

/// Groups parsed parts into `<speak>` chunks, flushing whenever the next
/// part would push the running rune count past `wanted_chars + interval`.
///
/// # Errors
/// Propagates `SplitError` from sub-splitting an oversized `Text` part.
pub fn segment_ssml(doc: &[SsmlPart], wanted_chars: usize, interval: usize) -> Result<Vec<Vec<SsmlPart>>, SplitError> {
	let budget = wanted_chars + interval;
	let mut chunks: Vec<Vec<SsmlPart>> = Vec::new();
	let mut current: Vec<SsmlPart> = Vec::new();
	let mut current_len = 0usize;

	for part in doc {
		let pieces = match part {
			SsmlPart::Text { parts, voice, speed } if part.rune_len() > budget => split_text_parts(parts, voice, *speed)?,
			other => vec![other.clone()],
		};
		for piece in pieces {
			let piece_len = piece.rune_len();
			if current_len + piece_len > budget && !current.is_empty() {
				chunks.push(std::mem::take(&mut current));
				current_len = 0;
			}
			current_len += piece_len;
			current.push(piece);
		}
	}
	if !current.is_empty() {
		chunks.push(current);
	}
	Ok(chunks)
}

/// Re-serializes one chunk as a standalone `<speak>` document.
#[must_use]
pub fn emit_ssml(chunk: &[SsmlPart]) -> String {
	let mut out = String::from("<speak>");
	for part in chunk {
		match part {
			SsmlPart::Pause { duration_ms } => {
				let _ = write!(out, "<break time=\"{duration_ms}ms\"/>");
			}
			SsmlPart::Text { voice, speed, parts } => {
				let _ = write!(out, "<voice name=\"{}\">", escape_attr(voice));
				let _ = write!(out, "<prosody rate=\"{}\">", to_rate_str(*speed));
				for p in parts {
					match p {
						TextPart::Plain(s) => out.push_str(&quick_xml::escape::escape(s)),
						TextPart::Word { text, acc, syll, user } => {
							let _ = write!(
								out,
								"<intelektika:w acc=\"{}\" syll=\"{}\" user=\"{}\">{}</intelektika:w>",
								escape_attr(acc),
								escape_attr(syll),
								escape_attr(user),
								quick_xml::escape::escape(text)
							);
						}
					}
				}
				out.push_str("</prosody></voice>");
			}
		}
	}
	out.push_str("</speak>");
	out
}

fn escape_attr(s: &str) -> String {
	quick_xml::escape::escape(s).into_owned()
}

/// Splits an SSML document into chunks and returns each chunk's
/// re-serialized `<speak>` text, the full §4.2 SSML pipeline.
///
/// # Errors
/// Propagates parse and split errors.
pub fn split_ssml(xml: &str) -> Result<Vec<String>, SsmlError> {
	let parts = parse_ssml(xml)?;
	let chunks = segment_ssml(&parts, WANTED_CHARS, INTERVAL)?;
	Ok(chunks.iter().map(|c| emit_ssml(c)).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn to_rate_str_matches_concrete_scenarios() {
		assert_eq!(to_rate_str(1.5), "75%");
		assert_eq!(to_rate_str(0.5), "200%");
		assert_eq!(to_rate_str(3.0), "50%");
		assert_eq!(to_rate_str(-1.75), "200%");
	}

	#[test]
	fn to_rate_str_is_clamp_invariant() {
		assert_eq!(to_rate_str(5.0), to_rate_str(2.0));
		assert_eq!(to_rate_str(-5.0), to_rate_str(0.5));
	}

	#[test]
	fn to_rate_str_is_monotone_decreasing() {
		let mut prev = f64::MAX;
		for tenth in 5..=20 {
			let r = f64::from(tenth) / 10.0;
			let pct: f64 = to_rate_str(r).trim_end_matches('%').parse().unwrap();
			assert!(pct <= prev);
			prev = pct;
		}
	}

	#[test]
	fn parse_ssml_extracts_voice_and_pause() {
		let xml = r#"<speak><voice name="astra"><prosody rate="100%">hello world</prosody></voice><break time="500ms"/></speak>"#;
		let parts = parse_ssml(xml).unwrap();
		assert_eq!(parts.len(), 2);
		match &parts[0] {
			SsmlPart::Text { voice, speed, parts } => {
				assert_eq!(voice, "astra");
				assert!((*speed - 1.0).abs() < 1e-9);
				assert_eq!(parts.len(), 1);
				assert_eq!(parts[0], TextPart::Plain("hello world".to_string()));
			}
			SsmlPart::Pause { .. } => panic!("expected text part"),
		}
		assert!(matches!(parts[1], SsmlPart::Pause { duration_ms: 500 }));
	}

	#[test]
	fn parse_ssml_extracts_accented_word() {
		let xml = r#"<speak><voice name="astra"><intelektika:w acc="1" syll="2" user="u">Vilnius</intelektika:w></voice></speak>"#;
		let parts = parse_ssml(xml).unwrap();
		match &parts[0] {
			SsmlPart::Text { parts, .. } => {
				assert_eq!(parts[0], TextPart::Word { text: "Vilnius".into(), acc: "1".into(), syll: "2".into(), user: "u".into() });
			}
			SsmlPart::Pause { .. } => panic!("expected text part"),
		}
	}

	#[test]
	fn segment_ssml_flushes_on_budget_and_preserves_text() {
		let long_word = "a. ".repeat(2000);
		let parts = vec![SsmlPart::Text { voice: "astra".into(), speed: 1.0, parts: vec![TextPart::Plain(long_word.clone())] }];
		let chunks = segment_ssml(&parts, WANTED_CHARS, INTERVAL).unwrap();
		assert!(chunks.len() > 1);
		let mut recombined = String::new();
		for chunk in &chunks {
			for part in chunk {
				if let SsmlPart::Text { parts, .. } = part {
					for p in parts {
						recombined.push_str(p.plain_text());
					}
				}
			}
		}
		assert_eq!(recombined, long_word);
	}

	#[test]
	fn split_ssml_round_trips_small_document() {
		let xml = r#"<speak><voice name="astra"><prosody rate="100%">olia olia</prosody></voice></speak>"#;
		let chunks = split_ssml(xml).unwrap();
		assert_eq!(chunks.len(), 1);
		assert!(chunks[0].contains("olia olia"));
		assert!(chunks[0].contains("astra"));
	}
}
