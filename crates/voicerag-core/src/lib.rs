// Core domain for the voice assistant: the wire protocol spoken with the
// realtime backend, tool-result actions, listings, preferences, and the
// assistant state those actions mutate.

pub mod listing;
pub mod preferences;
pub mod protocol;
pub mod state;
pub mod tool_result;

pub use listing::Listing;
pub use preferences::{Feature, Preferences, PreferencesUpdate, Range};
pub use protocol::{ClientMessage, ServerMessage, SessionConfig};
pub use state::{AssistantState, Page, StateChange};
pub use tool_result::{OutgoingMessage, ToolAction, ToolResultError};
