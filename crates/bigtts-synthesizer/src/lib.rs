//! Synthesizer Worker (§4.3): bounded-parallel remote synthesis calls with
//! idempotent skip of already-produced chunks.

pub mod client;
pub mod worker;

pub use client::{error_class, HttpSynthesizeClient, SynthesizeClient, SynthesizeError, SynthesizeRequest, CALL_TIMEOUT};
pub use worker::{ChunkFs, Worker, WorkerError};
