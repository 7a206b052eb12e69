//! `get_weather`: canned forecast for a city.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{CallToolResult, Tool, ToolDefinition, ToolError, parse_arguments};

const NAME: &str = "get_weather";

/// Reports the weather for a city. It is always raining.
pub struct GetWeather;

#[derive(Deserialize)]
struct Args {
    city: String,
}

#[async_trait]
impl Tool for GetWeather {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: NAME.into(),
            description: Some("Get the weather for a city".into()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "city": { "type": "string" }
                },
                "required": ["city"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<CallToolResult, ToolError> {
        let Args { city } = parse_arguments(NAME, arguments)?;
        Ok(CallToolResult::text(format!("The weather in {city} is rainy")))
    }
}
