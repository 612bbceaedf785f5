//! Tool system
//!
//! Tools are the platform operations the model can request. Each tool has:
//! - A name and description for the LLM
//! - A JSON schema for parameters
//! - A category that can be switched on and off as a group
//! - An execute method scoped by the current [`AIContext`]

pub mod database;
pub mod endpoint;
pub mod functions;
pub mod storage;
pub mod teams;
pub mod users;

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::AIContext;
use crate::error::ToolError;
use crate::platform::PlatformClient;

pub use endpoint::{EndpointSpec, EndpointTool, ParamKind, ParamSpec};

/// Boxed future type for object-safe async trait methods
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Set of enabled tool categories
pub type CategorySet = BTreeSet<ToolCategory>;

/// Coarse tool grouping, enabled or disabled together
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Database,
    Storage,
    Functions,
    Users,
    Teams,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 5] = [
        ToolCategory::Database,
        ToolCategory::Storage,
        ToolCategory::Functions,
        ToolCategory::Users,
        ToolCategory::Teams,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Database => "database",
            ToolCategory::Storage => "storage",
            ToolCategory::Functions => "functions",
            ToolCategory::Users => "users",
            ToolCategory::Teams => "teams",
        }
    }

    /// Every category
    pub fn all() -> CategorySet {
        Self::ALL.into_iter().collect()
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "database" | "databases" | "db" => Ok(ToolCategory::Database),
            "storage" | "buckets" => Ok(ToolCategory::Storage),
            "functions" | "function" => Ok(ToolCategory::Functions),
            "users" | "user" => Ok(ToolCategory::Users),
            "teams" | "team" => Ok(ToolCategory::Teams),
            _ => Err(format!("Unknown tool category: {}", s)),
        }
    }
}

/// Tool definition offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub category: ToolCategory,
}

/// Core trait for all tools
pub trait Tool: Send + Sync {
    /// Tool name (used by LLM to invoke)
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    fn category(&self) -> ToolCategory;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with given parameters, scoped by `context`
    fn execute<'a>(
        &'a self,
        params: Value,
        context: &'a AIContext,
    ) -> BoxFuture<'a, Result<Value, ToolError>>;

    /// Convert to tool definition for LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
            category: self.category(),
        }
    }
}

/// Registry of available tools, keyed by name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all tools regardless of category state
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of the tools whose category is enabled, sorted by name
    pub fn resolve(&self, enabled: &CategorySet) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .filter(|t| enabled.contains(&t.category()))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Route a call to its handler.
    ///
    /// The category is checked again here even though disabled tools are never
    /// offered, since the model may still name one.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Value,
        context: &AIContext,
        enabled: &CategorySet,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if !enabled.contains(&tool.category()) {
            return Err(ToolError::Disabled {
                name: name.to_string(),
                category: tool.category().to_string(),
            });
        }

        debug!(tool = name, category = %tool.category(), "Dispatching tool");
        tool.execute(args, context).await
    }
}

/// Build the registry holding every platform tool
pub fn create_platform_tool_registry(client: Arc<dyn PlatformClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let catalogs = [
        database::ENDPOINTS,
        storage::ENDPOINTS,
        functions::ENDPOINTS,
        users::ENDPOINTS,
        teams::ENDPOINTS,
    ];
    for spec in catalogs.into_iter().flatten() {
        registry.register(Arc::new(EndpointTool::new(spec, client.clone())));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResourceRef;
    use serde_json::json;

    struct EchoTool {
        name: &'static str,
        category: ToolCategory,
    }

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echo the arguments back"
        }

        fn category(&self) -> ToolCategory {
            self.category
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }

        fn execute<'a>(
            &'a self,
            params: Value,
            _context: &'a AIContext,
        ) -> BoxFuture<'a, Result<Value, ToolError>> {
            Box::pin(async move { Ok(params) })
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool {
            name: "list_databases",
            category: ToolCategory::Database,
        }));
        registry.register(Arc::new(EchoTool {
            name: "list_buckets",
            category: ToolCategory::Storage,
        }));
        registry
    }

    fn ctx() -> AIContext {
        AIContext::for_project(ResourceRef::from_id("p1"))
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Storage".parse::<ToolCategory>().unwrap(), ToolCategory::Storage);
        assert_eq!("db".parse::<ToolCategory>().unwrap(), ToolCategory::Database);
        assert!("billing".parse::<ToolCategory>().is_err());
    }

    #[test]
    fn test_resolve_filters_disabled_categories() {
        let mut enabled = ToolCategory::all();
        enabled.remove(&ToolCategory::Storage);

        let names: Vec<_> = registry()
            .resolve(&enabled)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["list_databases"]);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let err = registry()
            .dispatch("drop_everything", json!({}), &ctx(), &ToolCategory::all())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dispatch_disabled_tool() {
        let enabled: CategorySet = [ToolCategory::Database].into_iter().collect();
        let err = registry()
            .dispatch("list_buckets", json!({}), &ctx(), &enabled)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Disabled { .. }));
        assert!(err.to_string().contains("storage"));
    }

    #[tokio::test]
    async fn test_dispatch_enabled_tool() {
        let out = registry()
            .dispatch("list_databases", json!({"limit": 5}), &ctx(), &ToolCategory::all())
            .await
            .unwrap();
        assert_eq!(out, json!({"limit": 5}));
    }
}
