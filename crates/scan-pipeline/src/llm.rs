//! Client for the text-generation service
//!
//! One request/response exchange per narrative, against an OpenAI-compatible
//! chat completions endpoint. The response is passed through as structured
//! JSON; downstream consumers read `choices[0].message.content`.

use async_trait::async_trait;
use dockwatch_common::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// System instructions for the context-summary role: descriptive,
/// non-judgmental environment context, no conclusions, no remediation.
const CONTEXT_SUMMARY_PROMPT: &str = "You are an information security specialist focused on \
analyzing container images. Your role is to interpret the information provided about a \
container image, including its configuration, name, metadata and other relevant \
characteristics, with the goal of contextualizing the environment for a vulnerability \
analysis that will be performed afterwards. Based on the data received: describe the \
configuration and the components of the image; explain how these characteristics may \
influence the upcoming vulnerability analysis; provide context about the deployment \
environment, highlighting aspects that may be relevant to security. Do not draw \
conclusions or suggest actions. Only contextualize the information to prepare the ground \
for the vulnerability analysis.";

/// System instructions for the risk-analysis role: CIA impact, attack
/// vectors, 0-100 criticality score, executive summary, remediation that
/// prefers non-upgrade mitigations.
const RISK_ANALYSIS_PROMPT: &str = "You are an information security specialist in \
vulnerability and CVE analysis for containerized workloads. Your role is to analyze \
security reports, identify critical vulnerabilities, detail the risks associated with \
each CVE and recommend mitigation actions. When responding, provide precise technical \
information, including the impact on confidentiality, integrity and availability, \
plausible attack vectors and suggested fixes. Keep the language clear and objective, with \
the depth needed to guide cybersecurity professionals. At the end of each analysis, \
produce an executive summary so that non-technical stakeholders can understand the risk. \
Additionally, rate the criticality of the vulnerability with a score from 0 to 100, where \
0 means nonexistent risk and 100 means completely unacceptable risk. Propose resolution \
measures that minimize the risk, prioritizing alternatives that do not require version \
upgrades, but recommend an upgrade when it is clearly the most viable way to mitigate the \
threat. The input parameter is a JSON document.";

/// The two fixed role configurations for narrative generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeRole {
    /// Summarize image/environment metadata into context
    ContextSummary,
    /// Turn one vulnerability detail record into a risk narrative
    RiskAnalysis,
}

impl NarrativeRole {
    pub fn system_prompt(self) -> &'static str {
        match self {
            NarrativeRole::ContextSummary => CONTEXT_SUMMARY_PROMPT,
            NarrativeRole::RiskAnalysis => RISK_ANALYSIS_PROMPT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NarrativeRole::ContextSummary => "context-summary",
            NarrativeRole::RiskAnalysis => "risk-analysis",
        }
    }
}

/// Generates one narrative per call from arbitrary structured input.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn generate(&self, role: NarrativeRole, payload: &Value) -> Result<Value>;
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

/// Production client for an OpenAI-compatible chat completions endpoint
pub struct LlmClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            base_url,
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl NarrativeService for LlmClient {
    async fn generate(&self, role: NarrativeRole, payload: &Value) -> Result<Value> {
        debug!("Requesting {} narrative from {}", role.label(), self.model);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: role.system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: payload.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Narrative(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Narrative(format!(
                "generation service returned status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Narrative(format!("invalid response body: {e}")))?;

        // Downstream consumers address the generated text at this fixed
        // path; a response without it is an enrichment failure now, not a
        // rendering surprise later.
        let content = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str);
        if content.is_none() {
            return Err(Error::ResponseShape {
                service: "text-generation".to_string(),
                reason: "missing choices[0].message.content".to_string(),
            });
        }

        Ok(body)
    }
}
