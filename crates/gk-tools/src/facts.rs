//! Random fact tool backed by a local list.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use gk_core::{Error, Tool, ToolDefinition, ToolOutput, ToolParameters};

pub const FACTS: &[&str] = &[
    "Honey never spoils. Archaeologists have found edible honey in ancient Egyptian tombs.",
    "A group of flamingos is called a 'flamboyance'.",
    "Octopuses have three hearts and blue blood.",
    "The shortest war in history lasted only 38-45 minutes (Anglo-Zanzibar War, 1896).",
    "Bananas are berries, but strawberries aren't.",
    "The human brain contains approximately 86 billion neurons.",
    "A day on Venus is longer than its year.",
    "Sharks have been around longer than trees.",
    "There are more possible games of chess than atoms in the observable universe.",
    "A single cloud can weigh more than a million pounds.",
];

pub fn random_fact() -> &'static str {
    FACTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FACTS[0])
}

pub struct RandomFactTool;

#[async_trait]
impl Tool for RandomFactTool {
    fn name(&self) -> &str {
        "random_fact"
    }

    fn description(&self) -> &str {
        "Get a random interesting fact."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(ToolParameters::new())
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        Ok(ToolOutput::success(format!("Random fact: {}", random_fact())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_fact_comes_from_list() {
        for _ in 0..20 {
            assert!(FACTS.contains(&random_fact()));
        }
    }

    #[tokio::test]
    async fn test_tool_output() {
        let tool = RandomFactTool;
        assert!(!tool.requires_approval());

        let out = tool.execute(serde_json::json!({})).await.unwrap();
        let fact = out.content.strip_prefix("Random fact: ").unwrap();
        assert!(FACTS.contains(&fact));
    }
}
