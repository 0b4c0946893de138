pub mod message;
pub mod document;

pub use message::{Message, Role, MessageId};
pub use document::{DocumentRecord, DocumentInfo};
