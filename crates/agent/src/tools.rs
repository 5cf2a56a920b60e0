use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::llm::ToolSpec;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),
    #[error("tool execution failure: {0}")]
    Execution(String),
}

/// A named, schema-constrained operation the language model may request.
///
/// Implementations report business and storage failures as structured JSON
/// (`{"success": false, ...}` / `{"error": ...}`) rather than `Err`: the
/// model has to be able to read the failure and relay it. `Err` is reserved
/// for malformed argument payloads.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the argument object, as declared to the model.
    fn parameters(&self) -> Value;
    async fn execute(&self, arguments: Value) -> Result<Value, ToolError>;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Declarations for the model, in stable name order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{Tool, ToolError, ToolRegistry};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "echo the arguments back"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn registry_resolves_and_describes_tools() {
        let mut registry = ToolRegistry::default();
        registry.register(EchoTool);

        assert_eq!(registry.len(), 1);
        let tool = registry.get("echo").expect("echo registered");
        let result = tool.execute(json!({"hello": 1})).await.expect("execute");
        assert_eq!(result, json!({"hello": 1}));

        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
        assert!(registry.get("missing").is_none());
    }
}
