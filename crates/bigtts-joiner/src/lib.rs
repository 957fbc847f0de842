//! The Joiner Worker (§4.4): builds `<work>/{}/list.txt` from the dense
//! prefix of present `NNNN.<fmt>` chunks, then invokes an external
//! container-concat tool to produce `<joinOut>/{}/result.<fmt>`.

mod worker;

pub use worker::{ChunkFs, ConcatTool, Worker, WorkerError};
