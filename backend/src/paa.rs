//! PAA (People Also Ask) search client and the canned free-tier dataset.
//!
//! Builder and admin callers hit the live search service; free callers
//! get a fixed demo payload so the endpoint stays useful without
//! spending upstream quota.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum PaaError {
    #[error("PAA service error: {0}")]
    Backend(String),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    related_questions: Vec<RelatedQuestion>,
}

#[derive(Debug, Deserialize)]
struct RelatedQuestion {
    question: String,
    #[serde(default)]
    related_queries: Vec<String>,
}

/// One "people also ask" entry in the public response shape.
#[derive(Debug, Clone, Serialize)]
pub struct PaaQuestion {
    pub question: String,
    pub position: usize,
    pub cluster: String,
    pub related_queries: Vec<String>,
}

/// Client for the PAA search HTTP API.
pub struct PaaClient {
    http_client: Client,
    base_url: String,
}

impl PaaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PaaError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaaError::Backend(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Run a live search and return questions in response order.
    pub async fn search(
        &self,
        query: &str,
        location: &str,
        language: &str,
    ) -> Result<Vec<PaaQuestion>, PaaError> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .json(&json!({
                "query": query,
                "location": location,
                "language": language,
            }))
            .send()
            .await
            .map_err(|e| PaaError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaaError::Backend(format!(
                "search returned {}",
                response.status()
            )));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| PaaError::Backend(e.to_string()))?;

        Ok(data
            .related_questions
            .into_iter()
            .enumerate()
            .map(|(index, entry)| PaaQuestion {
                question: entry.question,
                position: index + 1,
                // TODO: real clustering once the search service exposes topic labels
                cluster: "Auto-generated".to_string(),
                related_queries: entry.related_queries,
            })
            .collect())
    }
}

/// Fixed demo payload served to free-tier callers. The caller's query is
/// echoed back but the question set never changes.
pub fn demo_results(query: &str, location: &str, language: &str) -> serde_json::Value {
    json!({
        "query": query,
        "location": location,
        "language": language,
        "questions": [
            {
                "question": "What is SEO automation?",
                "position": 1,
                "cluster": "Basics",
                "related_queries": ["SEO tools", "automated SEO", "SEO software"]
            },
            {
                "question": "How to automate SEO tasks?",
                "position": 2,
                "cluster": "Implementation",
                "related_queries": ["SEO workflow", "automation tools", "SEO process"]
            },
            {
                "question": "Best SEO automation tools?",
                "position": 3,
                "cluster": "Tools",
                "related_queries": ["SEO platforms", "automation software", "SEO suite"]
            },
            {
                "question": "Is SEO automation worth it?",
                "position": 4,
                "cluster": "Benefits",
                "related_queries": ["SEO ROI", "automation benefits", "SEO efficiency"]
            }
        ],
        "clusters": [
            { "name": "Basics", "count": 1, "questions": ["What is SEO automation?"] },
            { "name": "Implementation", "count": 1, "questions": ["How to automate SEO tasks?"] },
            { "name": "Tools", "count": 1, "questions": ["Best SEO automation tools?"] },
            { "name": "Benefits", "count": 1, "questions": ["Is SEO automation worth it?"] }
        ],
        "metadata": {
            "total_questions": 4,
            "total_clusters": 4,
            "processing_time": "0.5s",
            "data_source": "demo",
            "tier": "free"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_results_echo_inputs() {
        let data = demo_results("keyword research", "Germany", "de");
        assert_eq!(data["query"], "keyword research");
        assert_eq!(data["location"], "Germany");
        assert_eq!(data["language"], "de");
        assert_eq!(data["questions"].as_array().unwrap().len(), 4);
        assert_eq!(data["metadata"]["data_source"], "demo");
        assert_eq!(data["metadata"]["tier"], "free");
    }

    #[test]
    fn test_demo_question_set_is_fixed() {
        let a = demo_results("a", "US", "en");
        let b = demo_results("b", "US", "en");
        assert_eq!(a["questions"], b["questions"]);
        assert_eq!(a["clusters"], b["clusters"]);
    }

    #[test]
    fn test_search_response_parsing() {
        let body = r#"{
            "related_questions": [
                {"question": "What is link building?", "related_queries": ["backlinks", "outreach"]},
                {"question": "How long does SEO take?"}
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.related_questions.len(), 2);
        assert_eq!(parsed.related_questions[0].related_queries.len(), 2);
        assert!(parsed.related_questions[1].related_queries.is_empty());
    }

    #[test]
    fn test_search_response_missing_questions_defaults_empty() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.related_questions.is_empty());
    }
}
