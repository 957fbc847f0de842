//! Splitter Worker (§4.2): loads an uploaded text, segments it into chunk
//! files no longer than `wantedChars + wantedChars/4` runes, plain-text or
//! SSML depending on content.

pub mod plaintext;
pub mod ssml;
pub mod worker;

pub use plaintext::{split_plain_text, SplitError, INTERVAL, WANTED_CHARS};
pub use ssml::{segment_ssml, split_ssml, to_rate_str, SsmlError};
pub use worker::{DirCreator, FileLoader, FileSaver, Worker, WorkerError};
