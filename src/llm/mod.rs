//! Language-model plumbing: chat-completions client, JSON recovery and
//! structured field extraction.

mod client;
mod extractor;
pub mod prompts;
pub mod recovery;

pub use client::{
    ChatClient, ChatError, ChatRequest, ChatTransport, ReqwestTransport, TransportError,
    TransportResponse,
};
pub use extractor::{coerce_record, AnalysisError, FieldExtractor, StructuredFieldExtractor};
pub use recovery::{recover_json, RecoveryError};
