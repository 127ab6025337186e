//! Student-records query tool.
//!
//! Two steps: the language model translates the question into one SQLite
//! statement using the database schema, then the statement runs against the
//! read-only database. Every failure is reported as a Vietnamese sentence so
//! the reasoning loop can carry on.

use async_trait::async_trait;
use edupolicy_core::backend::StructuredBackend;
use edupolicy_core::error::ToolError;
use edupolicy_core::message::Message;
use edupolicy_core::provider::{Provider, ProviderRequest};
use edupolicy_core::tool::{Tool, ToolName};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Returned when the database file is absent.
pub const SQL_NOT_CONFIGURED: &str = "Cơ sở dữ liệu sinh viên chưa được cấu hình. Vui lòng cung cấp \
     tệp data/student_records.db trước khi sử dụng truy vấn SQL.";

/// Row cap suggested to the model.
const QUERY_ROW_LIMIT: usize = 5;

fn translation_prompt(schema: &str, question: &str) -> String {
    format!(
        "You are a SQLite expert. Given an input question, first create a syntactically correct \
         SQLite query to run, then look at the results of the query and return the answer to the \
         input question.\n\
         Unless the user specifies in the question a specific number of examples to obtain, query \
         for at most {QUERY_ROW_LIMIT} results using the LIMIT clause as per SQLite. You can order \
         the results to return the most informative data in the database.\n\
         Never query for all columns from a table. You must query only the columns that are needed \
         to answer the question. Wrap each column name in double quotes (\") to denote them as \
         delimited identifiers.\n\
         Pay attention to use only the column names you can see in the tables below. Be careful to \
         not query for columns that do not exist. Also, pay attention to which column is in which \
         table.\n\
         Pay attention to use date('now') function to get the current date, if the question \
         involves \"today\".\n\n\
         Use the following format:\n\n\
         Question: Question here\n\
         SQLQuery: SQL Query to run\n\
         SQLResult: Result of the SQLQuery\n\
         Answer: Final answer here\n\n\
         Only use the following tables:\n{schema}\n\n\
         Question: {question}\n\
         SQLQuery: "
    )
}

/// Pull the SQL statement out of a model reply.
///
/// Accepts a bare statement, a `SQLQuery:` prefixed one, or a fenced block,
/// and drops anything from `SQLResult:` onwards.
pub fn extract_sql(reply: &str) -> Option<String> {
    let mut text = reply.trim();

    if let Some(idx) = text.find("SQLQuery:") {
        text = &text[idx + "SQLQuery:".len()..];
    }
    if let Some(idx) = text.find("SQLResult:") {
        text = &text[..idx];
    }

    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("sqlite").or_else(|| rest.strip_prefix("sql")).unwrap_or(rest);
        text = rest.split("```").next().unwrap_or("").trim();
    }

    let sql = text.trim().trim_end_matches(';').trim();
    if sql.is_empty() { None } else { Some(sql.to_string()) }
}

/// Render rows as a ` | ` table with `col_1 … col_n` headers.
pub fn format_rows(rows: &[Vec<String>]) -> String {
    let width = rows.first().map(|r| r.len()).unwrap_or(0);
    let header: Vec<String> = (1..=width).map(|i| format!("col_{i}")).collect();
    let mut lines = vec![header.join(" | ")];
    lines.extend(rows.iter().map(|row| row.join(" | ")));
    lines.join("\n")
}

pub struct SqlTool {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    backend: Option<Arc<dyn StructuredBackend>>,
}

impl SqlTool {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        backend: Option<Arc<dyn StructuredBackend>>,
    ) -> Self {
        Self { provider, model: model.into(), temperature, backend }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    async fn translate(&self, backend: &dyn StructuredBackend, question: &str) -> Result<String, String> {
        let schema = backend.schema().await.map_err(|e| e.to_string())?;

        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::user(translation_prompt(&schema, question))],
        );
        request.temperature = self.temperature;
        request.stop = vec!["\nSQLResult:".into()];

        let response = self.provider.complete(request).await.map_err(|e| e.to_string())?;
        extract_sql(&response.content)
            .ok_or_else(|| "mô hình không trả về câu lệnh SQL".to_string())
    }

    /// Answer a natural-language question about student records.
    pub async fn query(&self, question: &str) -> String {
        info!(question, "sql_tool received question");
        let Some(backend) = &self.backend else {
            return SQL_NOT_CONFIGURED.to_string();
        };

        let sql = match self.translate(backend.as_ref(), question).await {
            Ok(sql) => sql,
            Err(reason) => {
                warn!(reason = %reason, "SQL translation failed");
                return format!("Không thể tạo truy vấn SQL từ câu hỏi. Chi tiết: {reason}");
            }
        };
        debug!(sql = %sql, "Generated SQL");

        let rows = match backend.execute(&sql).await {
            Ok(rows) => rows,
            Err(e) => {
                let reason = match e {
                    ToolError::ExecutionFailed { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(sql = %sql, reason = %reason, "SQL execution failed");
                return format!("Truy vấn SQL chạy thất bại: {reason}. Câu lệnh: {sql}");
            }
        };

        if rows.is_empty() {
            return format!("Không tìm thấy bản ghi phù hợp. SQL: {sql}");
        }
        format!("Kết quả truy vấn:\n{}\n\n(SQL: {sql})", format_rows(&rows))
    }
}

#[async_trait]
impl Tool for SqlTool {
    fn name(&self) -> ToolName {
        ToolName::SqlTool
    }

    fn description(&self) -> &str {
        "Use for questions about student records, warnings, GPA, statistics. \
         Input should be a clear question in Vietnamese."
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        Ok(self.query(input).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::student_db::tests::seeded_db;
    use edupolicy_core::error::ProviderError;
    use edupolicy_core::provider::ProviderResponse;
    use std::sync::Mutex;

    /// Replies with a fixed string and keeps the prompts it saw.
    struct CannedProvider {
        reply: Result<String, ProviderError>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedProvider {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self { reply: Ok(reply.into()), prompts: Mutex::new(vec![]) })
        }
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages[0].content.clone());
            self.reply.clone().map(|content| ProviderResponse {
                content,
                usage: None,
                model: request.model,
            })
        }
    }

    #[test]
    fn extract_sql_variants() {
        assert_eq!(extract_sql("SELECT 1").as_deref(), Some("SELECT 1"));
        assert_eq!(
            extract_sql("SQLQuery: SELECT \"name\" FROM students;\nSQLResult: ...").as_deref(),
            Some("SELECT \"name\" FROM students")
        );
        assert_eq!(
            extract_sql("```sql\nSELECT COUNT(*) FROM students\n```").as_deref(),
            Some("SELECT COUNT(*) FROM students")
        );
        assert_eq!(extract_sql("SQLQuery:   "), None);
    }

    #[test]
    fn format_rows_table() {
        let rows = vec![
            vec!["An".to_string(), "3.5".to_string()],
            vec!["Bình".to_string(), "1.8".to_string()],
        ];
        assert_eq!(format_rows(&rows), "col_1 | col_2\nAn | 3.5\nBình | 1.8");
    }

    #[tokio::test]
    async fn missing_database_returns_not_configured() {
        let tool = SqlTool::new(CannedProvider::ok("SELECT 1"), "m", 0.1, None);
        let out = tool.invoke("Có bao nhiêu sinh viên?").await.unwrap();
        assert_eq!(out, SQL_NOT_CONFIGURED);
        assert!(!out.contains("Error"));
    }

    #[tokio::test]
    async fn query_returns_formatted_rows() {
        let provider = CannedProvider::ok(
            "SELECT \"name\", \"warning_level\" FROM students WHERE \"warning_level\" > 0 ORDER BY \"id\"",
        );
        let tool = SqlTool::new(provider.clone(), "m", 0.1, Some(Arc::new(seeded_db().await)));

        let out = tool.query("Sinh viên nào bị cảnh báo học vụ?").await;
        assert!(out.starts_with("Kết quả truy vấn:\ncol_1 | col_2\nTrần Thị Bình | 1\n"));
        assert!(out.ends_with("(SQL: SELECT \"name\", \"warning_level\" FROM students WHERE \"warning_level\" > 0 ORDER BY \"id\")"));

        // Schema with sample rows reaches the model
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("CREATE TABLE students"));
        assert!(prompts[0].ends_with("Question: Sinh viên nào bị cảnh báo học vụ?\nSQLQuery: "));
    }

    #[tokio::test]
    async fn empty_result_mentions_sql() {
        let provider = CannedProvider::ok("SELECT \"name\" FROM students WHERE \"gpa\" > 4");
        let tool = SqlTool::new(provider, "m", 0.1, Some(Arc::new(seeded_db().await)));
        let out = tool.query("Ai có GPA trên 4?").await;
        assert_eq!(
            out,
            "Không tìm thấy bản ghi phù hợp. SQL: SELECT \"name\" FROM students WHERE \"gpa\" > 4"
        );
    }

    #[tokio::test]
    async fn execution_failure_is_descriptive() {
        let provider = CannedProvider::ok("SELECT * FROM lecturers");
        let tool = SqlTool::new(provider, "m", 0.1, Some(Arc::new(seeded_db().await)));
        let out = tool.query("Danh sách giảng viên").await;
        assert!(out.starts_with("Truy vấn SQL chạy thất bại:"));
        assert!(out.ends_with("Câu lệnh: SELECT * FROM lecturers"));
    }

    #[tokio::test]
    async fn translation_failure_is_descriptive() {
        let provider = Arc::new(CannedProvider {
            reply: Err(ProviderError::Network("connection reset".into())),
            prompts: Mutex::new(vec![]),
        });
        let tool = SqlTool::new(provider, "m", 0.1, Some(Arc::new(seeded_db().await)));
        let out = tool.query("x").await;
        assert!(out.starts_with("Không thể tạo truy vấn SQL từ câu hỏi. Chi tiết:"));
        assert!(out.contains("connection reset"));
    }
}
