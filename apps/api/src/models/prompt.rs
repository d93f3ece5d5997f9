use serde::{Deserialize, Serialize};

/// Payload to request the generation of an extraction prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptGenerationRequest {
    /// Attribute to generate a prompt for, e.g. `heart_notes` or `Screen Resolution`.
    pub attribute_name: String,
    /// Optional human-readable context about the attribute.
    #[serde(default)]
    pub description: Option<String>,
    /// The attribute has a predefined set of allowed values.
    #[serde(default)]
    pub has_fixed_values: Option<bool>,
    /// The stored prompt for this attribute failed before; regenerate instead of reusing it.
    #[serde(default)]
    pub has_failed: Option<bool>,
}

impl PromptGenerationRequest {
    pub fn has_fixed_values(&self) -> bool {
        self.has_fixed_values.unwrap_or(false)
    }

    pub fn has_failed(&self) -> bool {
        self.has_failed.unwrap_or(false)
    }
}

/// A stored attribute returned by the vector store, with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarAttribute {
    pub attribute_name: String,
    pub prompt: String,
    pub system_role: String,
    /// Cosine distance; 0.0 is an exact match.
    pub distance: f32,
}

/// Ready-to-use LLM parameters returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPrompt {
    pub prompt: String,
    pub system_role: String,
    pub user_input: Option<String>,
}

/// One historical prompt example, as indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    pub id: String,
    pub attribute_name: String,
    pub prompt: String,
    pub system_role: String,
    pub original_id: String,
}

impl AttributeRecord {
    /// Stable index id derived from the attribute name: `attr_<lowercase, spaces as _>`.
    pub fn id_for(attribute_name: &str) -> String {
        format!("attr_{}", attribute_name.to_lowercase().replace(' ', "_"))
    }
}
