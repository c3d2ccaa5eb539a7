//! Current time tool.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};

use gk_core::{Error, Tool, ToolDefinition, ToolOutput, ToolParameters};

/// Describe `now` for the agent.
pub fn describe_time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Current time information:\n\
         • Local time: {}\n\
         • Day of week: {}\n\
         • ISO format: {}\n\
         • Unix timestamp: {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        now.format("%A"),
        now.to_rfc3339(),
        now.timestamp()
    )
}

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time with timezone information."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(ToolParameters::new())
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        Ok(ToolOutput::success(describe_time(&Local::now())))
    }
}
