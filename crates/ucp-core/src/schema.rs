use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalized descriptor of one downstream tool, as kept by the Tool Zoo.
///
/// `name` is fully qualified (`server_name.tool_name`) and unique across the
/// whole index; the Zoo never stores two schemas under the same name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub server_name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub schema_token_estimate: u32,
}

impl ToolSchema {
    /// Build a schema from a raw downstream `tools/list` entry, computing the
    /// derived token estimate from the serialized size.
    pub fn new(
        server_name: impl Into<String>,
        tool_name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        tags: BTreeSet<String>,
    ) -> Self {
        let server_name = server_name.into();
        let tool_name = tool_name.into();
        let name = format!("{server_name}.{tool_name}");
        let mut schema = Self {
            name,
            server_name,
            description: description.into(),
            input_schema,
            tags,
            metadata: serde_json::Map::new(),
            schema_token_estimate: 0,
        };
        schema.schema_token_estimate = schema.estimate_tokens();
        schema
    }

    /// `schema_token_estimate ≈ ceil(schema_serialized_bytes / 4)`.
    ///
    /// Serializes name, description, tags, and input_schema the way they'd be
    /// sent on the wire to the client, so the estimate tracks what actually
    /// lands in the model's context window.
    pub fn estimate_tokens(&self) -> u32 {
        let wire = serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        });
        let bytes = serde_json::to_vec(&wire).map(|v| v.len()).unwrap_or(0);
        bytes.div_ceil(4) as u32
    }

    /// Text blob embedded for semantic search: `name + description + tags`.
    pub fn embedding_text(&self) -> String {
        let mut text = String::with_capacity(self.description.len() + self.name.len() + 16);
        text.push_str(&self.name);
        text.push(' ');
        text.push_str(&self.description);
        for tag in &self.tags {
            text.push(' ');
            text.push_str(tag);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_fully_qualified() {
        let schema = ToolSchema::new(
            "fs",
            "read_file",
            "Read a file",
            serde_json::json!({"type": "object"}),
            BTreeSet::new(),
        );
        assert_eq!(schema.name, "fs.read_file");
    }

    #[test]
    fn token_estimate_is_nonzero_for_nonempty_schema() {
        let schema = ToolSchema::new(
            "fs",
            "read_file",
            "Read a file from disk",
            serde_json::json!({"type": "object", "properties": {"path": {"type": "string"}}}),
            BTreeSet::new(),
        );
        assert!(schema.schema_token_estimate > 0);
    }

    #[test]
    fn embedding_text_includes_tags() {
        let mut tags = BTreeSet::new();
        tags.insert("files".to_string());
        let schema = ToolSchema::new("fs", "read_file", "Read a file", serde_json::json!({}), tags);
        assert!(schema.embedding_text().contains("files"));
    }
}
