pub mod types;
pub mod chat;

pub use types::{
    Message,
    Role,
    MessageId,
    DocumentRecord,
    DocumentInfo,
};

pub use chat::{
    ChatRequest,
    ChatResponse,
    ChatOptions,
    ChatUsage,
    FinishReason,
};
