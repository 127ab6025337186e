//! Web search tool for public regulations (Ministry of Education and other
//! reputable sources).

use async_trait::async_trait;
use edupolicy_core::backend::{WebResult, WebSearchBackend};
use edupolicy_core::error::ToolError;
use edupolicy_core::tool::{Tool, ToolName};
use std::sync::Arc;
use tracing::{info, warn};

/// Returned when no search API key is configured.
pub const WEB_NOT_CONFIGURED: &str = "Web search hiện chưa được cấu hình (thiếu Tavily API key).";

/// Returned when the search has zero hits.
pub const WEB_NO_RESULTS: &str = "Không tìm thấy thông tin phù hợp trên web.";

fn format_result(r: &WebResult) -> String {
    format!("{}\n{}\nNguồn: {}", r.title, r.content, r.url)
}

pub struct WebTool {
    backend: Option<Arc<dyn WebSearchBackend>>,
    max_results: usize,
}

impl WebTool {
    pub fn new(backend: Option<Arc<dyn WebSearchBackend>>, max_results: usize) -> Self {
        Self { backend, max_results: max_results.max(1) }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Search and render hits as `title / content / Nguồn: url` blocks.
    pub async fn search(&self, query: &str, max_results: Option<usize>) -> String {
        let Some(backend) = &self.backend else {
            return WEB_NOT_CONFIGURED.to_string();
        };
        let n = max_results.filter(|n| *n > 0).unwrap_or(self.max_results);

        match backend.search(query, n).await {
            Ok(results) if results.is_empty() => WEB_NO_RESULTS.to_string(),
            Ok(results) => {
                info!(hits = results.len(), "Web search completed");
                results.iter().map(format_result).collect::<Vec<_>>().join("\n\n")
            }
            Err(e) => {
                warn!(error = %e, "Web search failed");
                let detail = match e {
                    ToolError::BackendUnavailable(msg) => msg,
                    other => other.to_string(),
                };
                format!("Không thể truy vấn Tavily: {detail}")
            }
        }
    }
}

#[async_trait]
impl Tool for WebTool {
    fn name(&self) -> ToolName {
        ToolName::WebTool
    }

    fn description(&self) -> &str {
        "Use to search trusted web sources such as the Ministry of Education. \
         Provide a short search query."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        Ok(self.search(input, None).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSearch {
        results: Result<Vec<WebResult>, String>,
        requested: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl WebSearchBackend for FakeSearch {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebResult>, ToolError> {
            self.requested.lock().unwrap().push(max_results);
            self.results.clone().map_err(ToolError::BackendUnavailable)
        }
    }

    fn fake(results: Result<Vec<WebResult>, String>) -> Arc<FakeSearch> {
        Arc::new(FakeSearch { results, requested: Mutex::new(vec![]) })
    }

    #[tokio::test]
    async fn not_configured_notice() {
        let tool = WebTool::new(None, 4);
        assert!(!tool.is_available());
        assert_eq!(tool.invoke("học phí").await.unwrap(), WEB_NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn formats_snippets_with_source() {
        let backend = fake(Ok(vec![
            WebResult {
                title: "Quy chế đào tạo".into(),
                content: "Thông tư 08/2021/TT-BGDĐT".into(),
                url: "https://moet.gov.vn/a".into(),
            },
            WebResult {
                title: "Học phí".into(),
                content: "Nghị định 81".into(),
                url: "https://moet.gov.vn/b".into(),
            },
        ]));
        let tool = WebTool::new(Some(backend.clone()), 4);

        let out = tool.search("quy chế", None).await;
        assert_eq!(
            out,
            "Quy chế đào tạo\nThông tư 08/2021/TT-BGDĐT\nNguồn: https://moet.gov.vn/a\n\n\
             Học phí\nNghị định 81\nNguồn: https://moet.gov.vn/b"
        );

        tool.search("quy chế", Some(2)).await;
        assert_eq!(*backend.requested.lock().unwrap(), vec![4, 2]);
    }

    #[tokio::test]
    async fn empty_results_notice() {
        let tool = WebTool::new(Some(fake(Ok(vec![]))), 4);
        assert_eq!(tool.search("x", None).await, WEB_NO_RESULTS);
    }

    #[tokio::test]
    async fn request_failure_notice() {
        let tool = WebTool::new(Some(fake(Err("HTTP 500".into()))), 4);
        assert_eq!(tool.search("x", None).await, "Không thể truy vấn Tavily: HTTP 500");
    }
}
