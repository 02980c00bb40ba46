//! Chat-family agents and their shared [`ChatCore`](core::ChatCore).
//!
//! ```text
//! ChatCore::{complete, open_session, remember, render_history,
//!           model_failure, memory_failure}   ← shared logic lives here
//!     ↑                 ↑                    ↑
//! BasicChatAgent   SessionChatAgent   MemoryChatAgent
//!  (stateless)     (recent turns)     (recent turns + facts)
//! ```

pub mod core;

pub(crate) mod basic_chat;
pub(crate) mod memory_chat;
pub(crate) mod session_chat;

// Re-exports so the parent mod can register agents without reaching into submodules.
pub(crate) use basic_chat::BasicChatAgent;
pub(crate) use memory_chat::MemoryChatAgent;
pub(crate) use session_chat::SessionChatAgent;
