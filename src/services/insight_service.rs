use std::collections::BTreeSet;
use std::path::PathBuf;

use serde_json::json;

use crate::data::repository;
use crate::models::activity::AppStats;
use crate::models::analysis::DashboardInsight;
use crate::models::file_meta::FileMeta;
use crate::services::classify_service::GeminiClassifier;

const INSIGHT_GENERATION_PROMPT: &str = "\
Analyze these file system stats and provide 3 \"Digital Curator Insights\". \
Focus on behavioral patterns like digital hoarding, inconsistent naming conventions, or project sprawl. \
Return a JSON array of objects with: title, description, type (optimization/security/clutter), priority (high/medium/low).";

/// Best-effort advisory generation. Every failure path collapses to an
/// empty list; nothing here is allowed to gate the main flow.
pub async fn generate_insights(
    classifier: &GeminiClassifier,
    stats: &AppStats,
    files: &[FileMeta],
) -> Vec<DashboardInsight> {
    let context = insight_context(stats, files);
    let prompt = format!("{INSIGHT_GENERATION_PROMPT}\nStats Context: {context}");

    match classifier.generate(&prompt, None).await {
        Ok(text) => parse_insights(&text),
        Err(e) => {
            log::debug!("insight generation failed: {e}");
            Vec::new()
        }
    }
}

/// Refresh the persisted insights in the background. Intended for
/// `tokio::spawn`; opens its own connection and swallows every error.
pub async fn refresh_insights(
    db_path: PathBuf,
    classifier: GeminiClassifier,
    stats: AppStats,
    files: Vec<FileMeta>,
) {
    let insights = generate_insights(&classifier, &stats, &files).await;
    if insights.is_empty() {
        return;
    }

    let conn = match rusqlite::Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            log::debug!("insight persistence skipped: {e}");
            return;
        }
    };
    let mut current = repository::get_stats(&conn);
    current.ai_insights = insights;
    repository::put_stats(&conn, &current);
}

fn insight_context(stats: &AppStats, files: &[FileMeta]) -> String {
    let file_types: Vec<String> = files
        .iter()
        .map(|f| f.mime_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(10)
        .collect();

    json!({
        "totalFiles": files.len(),
        "totalSize": stats.space_analyzed,
        "fileTypes": file_types,
    })
    .to_string()
}

fn parse_insights(text: &str) -> Vec<DashboardInsight> {
    let trimmed = text.trim();
    if let Ok(insights) = serde_json::from_str(trimmed) {
        return insights;
    }

    // The model sometimes wraps the array in prose or a code fence.
    let start = trimmed.find('[');
    let end = trimmed.rfind(']');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(insights) = serde_json::from_str(&trimmed[start..=end]) {
                return insights;
            }
        }
    }

    log::debug!("insight response was not a parsable array");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{InsightKind, InsightPriority};
    use chrono::Utc;
    use std::path::PathBuf;

    fn meta(name: &str, mime: &str) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            size_bytes: 1,
            mime_type: mime.to_string(),
            modified_at: Utc::now(),
            relative_path: name.to_string(),
            content_snippet: None,
            absolute_path: PathBuf::from(name),
        }
    }

    #[test]
    fn test_insight_context_dedupes_file_types() {
        let files = vec![
            meta("a.txt", "text/plain"),
            meta("b.txt", "text/plain"),
            meta("c.pdf", "application/pdf"),
        ];
        let context = insight_context(&AppStats::default(), &files);

        assert!(context.contains("\"totalFiles\":3"));
        assert_eq!(context.matches("text/plain").count(), 1);
    }

    #[test]
    fn test_parse_insights_plain_array() {
        let text = r#"[{"title":"t","description":"d","type":"clutter","priority":"high"}]"#;
        let insights = parse_insights(text);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Clutter);
        assert_eq!(insights[0].priority, InsightPriority::High);
    }

    #[test]
    fn test_parse_insights_fenced_array() {
        let text = "```json\n[{\"title\":\"t\",\"description\":\"d\",\"type\":\"security\",\"priority\":\"low\"}]\n```";
        let insights = parse_insights(text);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Security);
    }

    #[test]
    fn test_parse_insights_garbage_is_empty_not_an_error() {
        assert!(parse_insights("the model had a bad day").is_empty());
        assert!(parse_insights("").is_empty());
    }
}
