use serde::{Deserialize, Serialize};

/// One classification outcome for one scanned file. `original_name` is the
/// join key back to the scan's file list; everything else is advisory output
/// from the classification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub original_name: String,
    pub suggested_name: String,
    pub category: String,
    #[serde(default)]
    pub is_junk: bool,
    #[serde(default)]
    pub reason: String,
    /// Slash-separated path relative to the scan root; "." means root.
    #[serde(default = "default_folder")]
    pub suggested_folder: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub contains_sensitive_data: bool,
    #[serde(default)]
    pub context_tags: Vec<String>,
}

fn default_folder() -> String {
    ".".to_string()
}

/// The classification service's response shape, used both for a single
/// chunk and for the merged whole-scan aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strategy: String,
    #[serde(default)]
    pub impact_score: u8,
    #[serde(default)]
    pub analyses: Vec<FileAnalysis>,
    #[serde(default)]
    pub is_already_organized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Optimization,
    Security,
    Clutter,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    High,
    Medium,
    Low,
    #[serde(other)]
    Unranked,
}

/// Best-effort advisory surfaced on the dashboard; never load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInsight {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub priority: InsightPriority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_analysis_parses_camel_case() {
        let raw = r#"{
            "originalName": "inv (3).pdf",
            "suggestedName": "invoice_2024_march.pdf",
            "category": "Finance",
            "isJunk": false,
            "reason": "Matches an invoice layout",
            "suggestedFolder": "Finance/Invoices",
            "confidence": 0.92,
            "containsSensitiveData": true,
            "contextTags": ["Invoice", "2024"]
        }"#;

        let parsed: FileAnalysis = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.original_name, "inv (3).pdf");
        assert_eq!(parsed.suggested_folder, "Finance/Invoices");
        assert!(parsed.contains_sensitive_data);
        assert_eq!(parsed.context_tags.len(), 2);
    }

    #[test]
    fn test_file_analysis_defaults_optional_fields() {
        let raw = r#"{"originalName": "a.txt", "suggestedName": "a.txt", "category": "Work"}"#;
        let parsed: FileAnalysis = serde_json::from_str(raw).unwrap();
        assert!(!parsed.is_junk);
        assert!(!parsed.contains_sensitive_data);
        assert_eq!(parsed.suggested_folder, ".");
        assert!(parsed.context_tags.is_empty());
    }

    #[test]
    fn test_report_defaults_is_already_organized() {
        let raw = r#"{"summary": "s", "strategy": "t", "impactScore": 40, "analyses": []}"#;
        let parsed: AnalysisReport = serde_json::from_str(raw).unwrap();
        assert!(!parsed.is_already_organized);
        assert_eq!(parsed.impact_score, 40);
    }

    #[test]
    fn test_insight_unknown_type_maps_to_fallback() {
        let raw = r#"{"title": "t", "description": "d", "type": "novel", "priority": "urgent"}"#;
        let parsed: DashboardInsight = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.kind, InsightKind::Other);
        assert_eq!(parsed.priority, InsightPriority::Unranked);
    }
}
