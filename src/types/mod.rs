//! Public types for the Huginn API.

mod message;
mod options;
mod response;

pub use message::{Message, Role};
pub use options::CompletionOptions;
pub use response::{ChatRequest, Choice, ChoiceMessage, CompletionResponse, TransportResponse};
