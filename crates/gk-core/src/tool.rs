use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ToolParameters::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: ToolParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

impl ToolParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_property(
        mut self,
        name: impl Into<String>,
        schema: PropertySchema,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), schema);
        if required {
            self.required.push(name);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            schema_type: "string".to_string(),
            description: Some(description.into()),
            enum_values: None,
        }
    }

    pub fn enum_string(description: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            schema_type: "string".to_string(),
            description: Some(description.into()),
            enum_values: Some(values),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Listing entry for the tools panel.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub requires_approval: bool,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    /// Whether calls go through the approval gate.
    fn requires_approval(&self) -> bool {
        false
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error>;
}

pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn info(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                requires_approval: t.requires_approval(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Run a tool by name. Unknown tools and tool errors come back as error
    /// outputs so one bad call never aborts the rest of a turn.
    pub async fn execute(&self, name: &str, arguments: Value) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "Unknown tool requested");
            return ToolOutput::error(format!("Unknown tool: {}", name));
        };

        debug!(tool = name, "Executing tool");
        match tool.execute(arguments).await {
            Ok(output) => output,
            Err(err) => {
                warn!(tool = name, error = %err, "Tool failed");
                ToolOutput::error(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text argument"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.name(), self.description()).with_parameters(
                ToolParameters::new().add_property("text", PropertySchema::string("Text"), true),
            )
        }

        async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
            match arguments.get("text").and_then(|v| v.as_str()) {
                Some(text) => Ok(ToolOutput::success(text)),
                None => Err(Error::tool("echo", "missing text")),
            }
        }
    }

    #[test]
    fn test_tool_definition() {
        let def = ToolDefinition::new("calculator", "Evaluate arithmetic").with_parameters(
            ToolParameters::new()
                .add_property("expression", PropertySchema::string("Expression"), true),
        );

        assert_eq!(def.name, "calculator");
        assert!(def.parameters.required.contains(&"expression".to_string()));

        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["parameters"]["type"], "object");
    }

    #[test]
    fn test_enum_schema() {
        let schema = PropertySchema::enum_string(
            "Operation",
            vec!["read".to_string(), "write".to_string()],
        );
        assert_eq!(schema.enum_values.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_registry_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let out = registry
            .execute("echo", serde_json::json!({"text": "hi"}))
            .await;
        assert!(!out.is_error);
        assert_eq!(out.content, "hi");

        let out = registry.execute("echo", serde_json::json!({})).await;
        assert!(out.is_error);
        assert!(out.content.contains("missing text"));

        let out = registry.execute("nope", serde_json::json!({})).await;
        assert!(out.is_error);

        let info = registry.info();
        assert_eq!(info.len(), 1);
        assert!(!info[0].requires_approval);
    }
}
