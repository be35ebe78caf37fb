use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::analysis::AnalysisReport;
use crate::models::file_meta::FileMeta;

/// Files per classification request.
pub const BATCH_SIZE: usize = 50;

const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const SYSTEM_INSTRUCTION: &str = r#"
You are the NeatStep AI Core, a high-performance Digital Ecosystem Consultant. Your mission is to transform chaotic local folders into professional, streamlined systems.

TASKS:
1. SUMMARY: Provide a 1-sentence observation about the provided file collection.
2. STRATEGY: Define a Master Organization Plan (e.g., "Group by fiscal year and isolate media assets").
3. IMPACT SCORE: A number 0-100 indicating how messy the current state is (100 = total chaos).
4. ANALYSIS: For each file:
   - SUGGESTED NAME: Clean, professional name. KEEP original if it is a standard technical file (e.g., "package.json", "index.ts").
   - CATEGORY: "Work", "Personal", "Code", "Finance", "Education", "Media", "Junk".
   - JUNK STATUS: Boolean. Flag empty, temp, or randomly named nonsense.
   - REASONING: Smart, concise explanation of the logic.
   - SUGGESTED FOLDER: A deep subfolder path (e.g., "Project/Assets/Icons").
   - CONFIDENCE: A decimal between 0.0 and 1.0.
   - SENSITIVE DATA: Boolean containsSensitiveData. Flag snippets exposing API keys, passwords or other secrets.
   - CONTEXT TAGS: 2-3 short tags (e.g., "Invoice", "2023").

JSON SCHEMA:
{
  "summary": "string",
  "strategy": "string",
  "impactScore": number,
  "isAlreadyOrganized": boolean,
  "analyses": [
    {
      "originalName": "string",
      "suggestedName": "string",
      "category": "string",
      "isJunk": boolean,
      "reason": "string",
      "suggestedFolder": "string",
      "confidence": number,
      "containsSensitiveData": boolean,
      "contextTags": ["string"]
    }
  ]
}
"#;

/// The external classification collaborator. One network-backed
/// implementation exists; tests substitute scripted ones.
#[allow(async_fn_in_trait)]
pub trait BatchClassifier {
    async fn classify_batch(
        &self,
        files: &[FileMeta],
        feedback: Option<&str>,
    ) -> Result<AnalysisReport, AppError>;
}

/// Classify `files` in fixed-size chunks, strictly one request at a time,
/// and merge the per-chunk reports into one aggregate.
///
/// Merge policy: analyses concatenate in chunk order; summary, strategy and
/// the already-organized flag come from the first chunk; the impact score is
/// the running pairwise average of the chunk scores. Any chunk failure
/// aborts the whole analysis and discards the chunks already classified.
pub async fn analyze<C: BatchClassifier>(
    classifier: &C,
    files: &[FileMeta],
    feedback: Option<&str>,
) -> Result<AnalysisReport, AppError> {
    let mut merged = AnalysisReport {
        summary: String::new(),
        strategy: String::new(),
        impact_score: 0,
        analyses: Vec::new(),
        is_already_organized: false,
    };
    let mut chunk_scores = Vec::new();

    for (index, chunk) in files.chunks(BATCH_SIZE).enumerate() {
        let report = match classifier.classify_batch(chunk, feedback).await {
            Ok(report) => report,
            Err(e) => {
                log::warn!("classification chunk {index} failed: {e}");
                return Err(AppError::Classification);
            }
        };
        log::debug!(
            "chunk {index}: {} analyses, impact {}",
            report.analyses.len(),
            report.impact_score
        );

        if index == 0 {
            merged.summary = report.summary;
            merged.strategy = report.strategy;
            merged.is_already_organized = report.is_already_organized;
        }
        chunk_scores.push(report.impact_score);
        merged.analyses.extend(report.analyses);
    }

    merged.impact_score = fold_impact_scores(&chunk_scores);
    Ok(merged)
}

/// Left-to-right pairwise running average, rounded once at the end. Chunk
/// order affects the result.
pub fn fold_impact_scores(scores: &[u8]) -> u8 {
    let mut scores = scores.iter();
    let Some(first) = scores.next() else {
        return 0;
    };
    let folded = scores.fold(*first as f64, |acc, s| (acc + *s as f64) / 2.0);
    folded.round() as u8
}

/// Pull the JSON payload out of a model response that may wrap it in a code
/// fence or surround it with prose.
pub fn extract_json_payload(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        if let Some(newline) = rest.find('\n') {
            let body = &rest[newline + 1..];
            if let Some(end) = body.find("```") {
                return Some(body[..end].trim().to_string());
            }
        }
    }

    let first = trimmed.find('{')?;
    let last = trimmed.rfind('}')?;
    if first <= last {
        return Some(trimmed[first..=last].to_string());
    }

    None
}

pub fn build_batch_prompt(files: &[FileMeta], feedback: Option<&str>) -> String {
    let file_data = files
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "type": f.mime_type,
                "size": format!("{:.2} KB", f.size_bytes as f64 / 1024.0),
                "snippet": f.content_snippet.as_deref().unwrap_or("No snippet available"),
                "path": f.relative_path,
            })
        })
        .collect::<Vec<_>>();

    let feedback_context = feedback
        .map(|text| {
            format!("\n\nUSER STRATEGY/REFINEMENT: \"{text}\". Override previous logic with this.")
        })
        .unwrap_or_default();

    format!(
        "Analyze this batch of files and determine if they are organized. \
         Also check snippets for secrets: {}{feedback_context}",
        serde_json::Value::Array(file_data)
    )
}

// ---------------------------------------------------------------------------
// Gemini-backed implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

fn extract_text(response: GeminiResponse) -> Option<String> {
    response
        .candidates
        .and_then(|mut candidates| candidates.pop())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .and_then(|mut parts| parts.pop())
        .and_then(|part| part.text)
}

#[derive(Debug, Clone)]
pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClassifier {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// One generateContent round trip returning the raw model text.
    pub async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, AppError> {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.2
            }
        });
        if let Some(instruction) = system_instruction {
            body["systemInstruction"] = json!({"parts": [{"text": instruction}]});
        }

        let endpoint = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let response = self.client.post(endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::General(format!(
                "classification request failed with status {status}"
            )));
        }

        let response: GeminiResponse = response.json().await?;
        extract_text(response)
            .ok_or_else(|| AppError::General("classification response missing text".to_string()))
    }
}

impl BatchClassifier for GeminiClassifier {
    async fn classify_batch(
        &self,
        files: &[FileMeta],
        feedback: Option<&str>,
    ) -> Result<AnalysisReport, AppError> {
        let prompt = build_batch_prompt(files, feedback);
        let text = self.generate(&prompt, Some(SYSTEM_INSTRUCTION)).await?;
        let payload = extract_json_payload(&text)
            .ok_or_else(|| AppError::General("response did not contain a JSON payload".to_string()))?;
        let report: AnalysisReport = serde_json::from_str(&payload)?;
        Ok(report)
    }
}
