//! Request/response contracts for the remote AutoArch services.

use async_trait::async_trait;
use autoarch_core::{Diagram, ProjectType};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Body of an AI generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AiPrompt {
    pub description: String,
    pub project_type: ProjectType,
}

/// A diagram snapshot submitted for code generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodegenRequest {
    #[serde(flatten)]
    pub diagram: Diagram,
    pub project_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodegenResponse {
    /// Where the generated project was written. Opaque to the editor.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The three remote calls the editor makes. Implementations must not touch
/// any editor state.
#[async_trait]
pub trait ArchService: Send + Sync {
    async fn fetch_template(&self, template_id: &str) -> Result<Diagram>;

    async fn generate_diagram(&self, prompt: &AiPrompt) -> Result<Diagram>;

    async fn generate_code(&self, request: &CodegenRequest) -> Result<CodegenResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codegen_request_is_flat() {
        let request = CodegenRequest {
            diagram: Diagram::default(),
            project_name: "shop".into(),
        };
        let value = serde_json::to_value(&request).expect("value");
        assert_eq!(
            value,
            serde_json::json!({"nodes": [], "edges": [], "project_name": "shop"})
        );
    }

    #[test]
    fn ai_prompt_wire_names() {
        let prompt = AiPrompt {
            description: "a food delivery app".into(),
            project_type: ProjectType::Mobile,
        };
        let value = serde_json::to_value(&prompt).expect("value");
        assert_eq!(value["projectType"], "mobile");
        assert_eq!(value["description"], "a food delivery app");
    }

    #[test]
    fn codegen_response_message_is_optional() {
        let response: CodegenResponse =
            serde_json::from_str(r#"{"path":"/tmp/out/shop"}"#).expect("parse");
        assert_eq!(response.path, "/tmp/out/shop");
        assert_eq!(response.message, None);
    }
}
