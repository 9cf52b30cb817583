use async_trait::async_trait;
use autoarch_core::settings::EditorSettings;
use autoarch_core::Diagram;
use reqwest::{Client, Response, Url};
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::parse::{error_message, parse_diagram};
use crate::service::{AiPrompt, ArchService, CodegenRequest, CodegenResponse};

/// [`ArchService`] over HTTP.
///
/// - `GET  {base}/templates/{id}`
/// - `POST {base}/generate-diagram`
/// - `POST {base}/generate`
#[derive(Debug, Clone)]
pub struct HttpArchService {
    client: Client,
    base_url: String,
}

impl HttpArchService {
    pub fn new(settings: &EditorSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api_base().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `{base}/templates/{id}` with the id percent-encoded as one segment.
    fn template_url(&self, template_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url("templates"))
            .map_err(|e| BridgeError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| BridgeError::InvalidUrl(self.base_url.clone()))?
            .push(template_id);
        Ok(url)
    }
}

/// Turns a non-success response into [`BridgeError::Status`], otherwise
/// returns the body text.
async fn read_body(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    let reason = status.canonical_reason().unwrap_or("Request failed");
    let message = error_message(&body, reason);
    warn!(status = status.as_u16(), %message, "remote call failed");
    Err(BridgeError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ArchService for HttpArchService {
    async fn fetch_template(&self, template_id: &str) -> Result<Diagram> {
        let url = self.template_url(template_id)?;
        debug!(%url, "fetching template");
        let body = read_body(self.client.get(url).send().await?).await?;
        parse_diagram(&body)
    }

    async fn generate_diagram(&self, prompt: &AiPrompt) -> Result<Diagram> {
        let url = self.url("generate-diagram");
        debug!(%url, project_type = prompt.project_type.as_str(), "requesting generated diagram");
        let body = read_body(self.client.post(&url).json(prompt).send().await?).await?;
        parse_diagram(&body)
    }

    async fn generate_code(&self, request: &CodegenRequest) -> Result<CodegenResponse> {
        let url = self.url("generate");
        debug!(
            %url,
            project = %request.project_name,
            nodes = request.diagram.nodes.len(),
            edges = request.diagram.edges.len(),
            "submitting diagram for code generation"
        );
        let body = read_body(self.client.post(&url).json(request).send().await?).await?;
        serde_json::from_str(&body).map_err(|e| BridgeError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_cleanly() {
        let settings = EditorSettings::default()
            .with_api_url_override(Some("http://localhost:8000/".into()));
        let service = HttpArchService::new(&settings).expect("client");
        assert_eq!(service.base_url(), "http://localhost:8000");
        assert_eq!(service.url("/templates/ios"), "http://localhost:8000/templates/ios");
        assert_eq!(service.url("generate"), "http://localhost:8000/generate");
    }

    #[test]
    fn template_ids_stay_in_one_segment() {
        let service = HttpArchService::new(&EditorSettings::default()).expect("client");
        assert_eq!(
            service.template_url("ios").expect("url").as_str(),
            "http://localhost:8000/templates/ios"
        );
        assert_eq!(
            service.template_url("../admin?x=1#y").expect("url").as_str(),
            "http://localhost:8000/templates/..%2Fadmin%3Fx=1%23y"
        );
    }

    #[test]
    fn base_url_under_a_prefix() {
        let settings = EditorSettings::default()
            .with_api_url_override(Some("http://arch.local/api/".into()));
        let service = HttpArchService::new(&settings).expect("client");
        assert_eq!(
            service.template_url("react").expect("url").as_str(),
            "http://arch.local/api/templates/react"
        );
    }
}
