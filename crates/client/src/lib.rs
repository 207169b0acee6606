pub mod diagnostics;
pub mod sse;
pub mod transport;
pub mod types;

mod client;
mod conversation;
mod error;
mod state;
mod token;

#[cfg(test)]
mod testing;

pub use chatgpt_auth::{AccessToken, AuthError, SessionCredential};
pub use client::{Client, ClientOptions};
pub use conversation::Conversation;
pub use error::{ClientError, DecodeError};
pub use state::{ConversationState, TurnAccumulator};
pub use token::TokenManager;
pub use types::*;
