//! The Inform Worker (§4.5): per-(id, type) locked email notification with
//! lock-then-send-then-mark-sent ordering, guaranteeing at-most-one
//! successful delivery even across concurrent consumers or redelivery.

mod template;
mod transport;
mod worker;

pub use template::{EmailTemplater, RenderedEmail, TemplateEmailMaker};
pub use transport::{EmailSender, LettreSender};
pub use worker::{InformError, Outcome, Worker};
