//! One stage handler per module, matching the list in §4.1. Each takes the
//! `Coordinator`'s shared dependencies and the inbound `JobMessage` and
//! returns the next queue to publish to, if any.

mod fail;
mod join;
mod split;
mod synthesize;
mod upload;

pub(crate) use fail::run as fail;
pub(crate) use join::run as join;
pub(crate) use split::run as split;
pub(crate) use synthesize::run as synthesize;
pub(crate) use upload::run as upload;
