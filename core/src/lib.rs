// Conversation engine for the food assistant:
// - Session and message identifiers
// - Reply line formatting
// - Request building and reply normalization
// - Conversation log and per-reply feedback
// - Configuration loading and shared error types

// Identifier generation
pub mod ids;
pub use ids::*;

// Reply line classification for display
pub mod format;
pub use format::*;

// Message, reply and wire data structures
pub mod types;
pub use types::*;

// Request building and reply normalization
pub mod protocol;
pub use protocol::*;

// HTTP transports and their traits
pub mod transport;
pub use transport::*;

// Conversation log and exchange sequencing
pub mod conversation;
pub use conversation::*;

// Per-message feedback state machine
pub mod feedback;
pub use feedback::*;

// Configuration loading
pub mod config;
pub use config::*;

// Shared error types
pub mod errors;
pub use errors::*;
