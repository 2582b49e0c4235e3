// Backend tools exposed to the realtime model: listing search and
// preference updates, the envelope their results travel in, and management
// of the listing index the search runs against.

pub mod index;
pub mod registry;
pub mod result;
pub mod search;
pub mod update_preferences;

pub use index::{index_definition, IndexManager};
pub use registry::{Tool, ToolError, ToolRegistry};
pub use result::{ToolResult, ToolResultDirection};
pub use search::{
    AzureSearch, ListingFilter, ListingSearch, SearchConfig, SearchError, SearchTool,
};
pub use update_preferences::{PreferenceStore, UpdatePreferencesTool};
