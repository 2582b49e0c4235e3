// Tool trait and the name-keyed registry the middle tier dispatches through.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::result::ToolResult;
use crate::search::SearchError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("no tool registered under `{0}`")]
    UnknownTool(String),

    #[error("arguments for `{tool}` are not valid JSON: {source}")]
    MalformedArguments {
        tool: String,
        source: serde_json::Error,
    },

    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// A function the realtime model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    /// Function schema advertised to the model in `session.update`.
    fn schema(&self) -> Value;

    async fn invoke(&self, args: Value) -> Result<ToolResult, ToolError>;
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool` under its own name, replacing any previous entry.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        info!("Registered tool {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Schemas of every registered tool, in name order.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Run a tool call. `arguments` is the JSON-encoded argument object the
    /// model produced; an empty string counts as `{}`.
    pub async fn invoke(&self, name: &str, arguments: &str) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments).map_err(|source| ToolError::MalformedArguments {
                tool: name.to_string(),
                source,
            })?
        };

        debug!("Invoking tool {} with {}", name, args);
        tool.invoke(args).await
    }
}
