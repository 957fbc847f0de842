//! Plain-text boundary finder (§4.2): a three-category rolling pattern over
//! the last three runes picks the next chunk boundary inside
//! `[start, start+interval)`.

use thiserror::Error;

/// Target chunk length in runes.
pub const WANTED_CHARS: usize = 1900;
/// Tolerance window searched around a multiple of `WANTED_CHARS`.
pub const INTERVAL: usize = WANTED_CHARS / 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SplitError {
	#[error("no split position found")]
	NoSplitPosition,
}

type Pattern = [char; 3];

const INITIAL_PATTERN: Pattern = [' ', ' ', ' '];

fn category(r: char) -> char {
	match r {
		'.' => '.',
		'\n' => '\n',
		' ' | '\t' => ' ',
		c if c.is_uppercase() => 'U',
		_ => '-',
	}
}

/// Rolls `r` into `pattern`, returning the new last-three-categories window.
///
/// A rune categorized as space is absorbed (pattern unchanged) when the
/// tail already ends in space or newline; a newline overwrites a trailing
/// space in place rather than shifting, so a run of `.`, `\n`, ` ` collapses
/// to a single boundary marker instead of scrolling it out of the window.
/// Pure function of its two arguments: only the last three categories and
/// the new rune determine the result (§8 law).
fn get_new_pattern(pattern: Pattern, r: char) -> Pattern {
	let c = category(r);
	let last = pattern[2];
	match c {
		' ' if last == ' ' || last == '\n' => pattern,
		'\n' if last == ' ' => [pattern[0], pattern[1], c],
		_ => [pattern[1], pattern[2], c],
	}
}

/// Picks the next split position in `text` (runes) within
/// `[start, start+interval)`.
///
/// Returns `text.len()` unchanged if the text is shorter than
/// `start + interval` (§8 law: nothing left to search, the remainder is the
/// final chunk). A `.\n\n` or `\n\n\n` pattern returns immediately
/// (paragraph break). Otherwise the highest-priority match seen in the
/// window wins, ties broken by whichever occurred first: (3) `.\nU`,
/// (2) `. U`, (1) any space.
///
/// # Errors
/// Returns `SplitError::NoSplitPosition` if no boundary of any priority
/// appears in the window.
pub fn get_next_split(text: &[char], start: usize, interval: usize) -> Result<usize, SplitError> {
	let n = text.len();
	if n < start + interval {
		return Ok(n);
	}

	let mut pattern = INITIAL_PATTERN;
	for &r in &text[..start] {
		pattern = get_new_pattern(pattern, r);
	}

	let mut best: Option<(u8, usize)> = None;
	for (i, &r) in text.iter().enumerate().skip(start).take(interval) {
		pattern = get_new_pattern(pattern, r);
		if pattern == ['.', '\n', '\n'] || pattern == ['\n', '\n', '\n'] {
			return Ok(i - 1);
		}
		if pattern == ['.', '\n', 'U'] {
			if best.map_or(true, |(p, _)| p < 3) {
				best = Some((3, i - 1));
			}
		} else if pattern == ['.', ' ', 'U'] {
			if best.map_or(true, |(p, _)| p < 2) {
				best = Some((2, i - 1));
			}
		} else if pattern[2] == ' ' && best.map_or(true, |(p, _)| p < 1) {
			best = Some((1, i));
		}
	}
	best.map(|(_, pos)| pos).ok_or(SplitError::NoSplitPosition)
}

/// Splits `text` into chunks of at most `WANTED_CHARS + INTERVAL` runes
/// each, breaking at the boundaries `get_next_split` picks.
///
/// # Errors
/// Returns `SplitError::NoSplitPosition` if some remaining slice longer
/// than `WANTED_CHARS + INTERVAL` runes has no viable boundary.
pub fn split_plain_text(text: &str) -> Result<Vec<String>, SplitError> {
	let runes: Vec<char> = text.chars().collect();
	let mut chunks = Vec::new();
	let mut offset = 0usize;
	while offset < runes.len() {
		let remaining = &runes[offset..];
		let pos = get_next_split(remaining, WANTED_CHARS, INTERVAL)?;
		if pos >= remaining.len() {
			chunks.push(remaining.iter().collect());
			break;
		}
		chunks.push(remaining[..=pos].iter().collect());
		offset += pos + 1;
	}
	if chunks.is_empty() {
		chunks.push(String::new());
	}
	Ok(chunks)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pat(s: &str) -> Pattern {
		let chars: Vec<char> = s.chars().collect();
		[chars[0], chars[1], chars[2]]
	}

	#[test]
	fn get_new_pattern_matches_reference_table() {
		let cases: &[(&str, char, &str)] = &[
			("   ", ' ', "   "),
			("   ", '.', "  ."),
			("   ", '\n', "  \n"),
			("   ", 'a', "  -"),
			("   ", 'A', "  U"),
			("  .", ' ', " . "),
			(" . ", ' ', " . "),
			(" . ", '\n', " .\n"),
			(" .\n", '\n', ".\n\n"),
			(" .\n", ' ', " .\n"),
			(" .\n", '\t', " .\n"),
			(" ..", '\t', ".. "),
		];
		for (before, r, want) in cases {
			assert_eq!(get_new_pattern(pat(before), *r), pat(want), "pattern {before:?} + {r:?}");
		}
	}

	#[test]
	fn get_new_pattern_is_pure() {
		assert_eq!(get_new_pattern(pat(" . "), '\n'), get_new_pattern(pat(" . "), '\n'));
	}

	#[test]
	fn get_next_split_returns_length_when_too_short() {
		let text: Vec<char> = "aaa aaa aaa aaa aaa".chars().collect();
		assert_eq!(get_next_split(&text, 10, 10), Ok(19));
	}

	#[test]
	fn get_next_split_picks_first_space_of_equal_priority() {
		let text: Vec<char> = "aaa aaa aaa aaa aaa aaa".chars().collect();
		assert_eq!(get_next_split(&text, 10, 10), Ok(11));
	}

	#[test]
	fn get_next_split_prefers_sentence_before_capital_word() {
		let text: Vec<char> = "aaa aaa aaa aaa. Aaa aaa".chars().collect();
		assert_eq!(get_next_split(&text, 10, 10), Ok(16));
	}

	#[test]
	fn get_next_split_returns_on_paragraph_break() {
		let text: Vec<char> = "aaa aaa. Aaa\n\naaa.\n Aaa aaa aaa".chars().collect();
		assert_eq!(get_next_split(&text, 5, 20), Ok(19));
	}

	#[test]
	fn get_next_split_errors_when_nothing_found() {
		let text: Vec<char> = "aaa aaaaaaaaaaa. aa. aaa".chars().collect();
		assert_eq!(get_next_split(&text, 5, 2), Err(SplitError::NoSplitPosition));
	}

	#[test]
	fn split_plain_text_concatenates_back_to_original() {
		let text = "hello world. this is a test.\n\nAnother paragraph follows here.";
		let chunks = split_plain_text(text).unwrap();
		assert_eq!(chunks.concat(), text);
	}

	#[test]
	fn split_plain_text_respects_chunk_budget() {
		let text = "a. ".repeat(2000);
		let chunks = split_plain_text(&text).unwrap();
		assert!(chunks.len() > 1);
		for chunk in &chunks {
			assert!(chunk.chars().count() <= WANTED_CHARS + INTERVAL);
		}
		assert_eq!(chunks.concat(), text);
	}
}
