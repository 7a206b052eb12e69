//! `addTwoNumbers`: sum of two numbers.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{CallToolResult, Tool, ToolDefinition, ToolError, parse_arguments};

const NAME: &str = "addTwoNumbers";

/// Adds `a` and `b` and returns the sum as text.
pub struct AddTwoNumbers;

#[derive(Deserialize)]
struct Args {
    a: f64,
    b: f64,
}

#[async_trait]
impl Tool for AddTwoNumbers {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: NAME.into(),
            description: Some("Add two numbers".into()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "a": { "type": "number" },
                    "b": { "type": "number" }
                },
                "required": ["a", "b"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<CallToolResult, ToolError> {
        let Args { a, b } = parse_arguments(NAME, arguments)?;
        Ok(CallToolResult::text(format_number(a + b)))
    }
}

/// Render a number the way JSON clients expect: integral values without a
/// trailing `.0`, infinities spelled out.
fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    format!("{n}")
}
