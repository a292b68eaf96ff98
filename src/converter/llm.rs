//! LLM-backed case generation.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::template::{case_from_draft, fallback_case};
use super::validation::{validate_draft, CaseDraft};
use super::{CaseConverter, QuestionAnalysis};
use crate::case::CaseOutcome;
use crate::error::ConversionError;
use crate::llm_client::{parse_json_response, tasks, LlmClient};
use crate::mcq::Mcq;

const SYSTEM_PROMPT: &str = "You are a neurology educator turning board-exam MCQs into clinical \
cases. Keep the exact medical concept, findings, lateralization and patient demographics of the \
question. Respond with a single JSON object.";

#[derive(Debug)]
pub struct LlmConverter {
    client: LlmClient,
    model: String,
    max_attempts: u32,
    validation_threshold: f64,
}

impl LlmConverter {
    pub fn new(client: LlmClient, model: &str, max_attempts: u32, validation_threshold: f64) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_attempts: max_attempts.max(1),
            validation_threshold,
        }
    }
}

/// User prompt for one MCQ.
pub fn build_prompt(mcq: &Mcq, analysis: &QuestionAnalysis) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("ORIGINAL MCQ (ID: {}):\n", mcq.id));
    prompt.push_str(&format!("Question: {}\n", mcq.question_text.trim()));
    prompt.push_str(&format!("Subspecialty: {}\n", mcq.subspecialty.trim()));
    prompt.push_str(&analysis.answer.prompt_block());

    prompt.push_str("\nANALYSIS:\n");
    prompt.push_str(&format!("- Question type: {}\n", analysis.question_type));
    prompt.push_str(&format!("- Complexity: {}\n", analysis.complexity.as_str()));
    prompt.push_str(&format!("- Patient: {}\n", analysis.profile.description()));
    prompt.push_str(&format!(
        "- Subspecialty keyword match: {:.0}%\n",
        analysis.specialty_confidence * 100.0
    ));

    prompt.push_str(&format!(
        "\nWrite a {} case for the same concept. Use the patient description exactly. \
The case must end at the question: \"{}\"\n",
        analysis.question_type,
        analysis.question_type.case_prompt()
    ));

    prompt.push_str(&format!(
        r#"
RESPONSE FORMAT (JSON):
{{
  "source_mcq_id": {},
  "clinical_presentation": {{
    "chief_complaint": "...",
    "history_present_illness": "...",
    "past_medical_history": ["..."],
    "medications": ["..."],
    "physical_examination": "...",
    "vital_signs": {{"bp": "...", "hr": "..."}}
  }},
  "question_prompt": "...",
  "core_concept_type": "...",
  "learning_objectives": ["..."]
}}
"#,
        mcq.id
    ));

    prompt
}

/// Parse a response into a draft, forcing the MCQ id to the requested one.
pub fn parse_draft(mcq: &Mcq, response: &str) -> Result<CaseDraft, ConversionError> {
    let mut draft: CaseDraft = parse_json_response(response)?;
    let claimed = draft.claimed_mcq_id();
    if claimed != Some(mcq.id) {
        warn!(
            "Response claimed MCQ {:?}, correcting to {}",
            claimed, mcq.id
        );
        draft.source_mcq_id = Some(mcq.id.into());
    }
    Ok(draft)
}

#[async_trait]
impl CaseConverter for LlmConverter {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn convert(&self, mcq: &Mcq) -> Result<CaseOutcome, ConversionError> {
        if mcq.question_text.trim().is_empty() {
            return Err(ConversionError::EmptyQuestion(mcq.id));
        }

        let analysis = QuestionAnalysis::of(mcq);
        debug!(
            mcq_id = mcq.id,
            question_type = %analysis.question_type,
            complexity = analysis.complexity.as_str(),
            specialty_confidence = analysis.specialty_confidence,
            "MCQ analyzed"
        );
        let prompt = build_prompt(mcq, &analysis);

        for attempt in 1..=self.max_attempts {
            let response = self
                .client
                .generate(
                    &self.model,
                    SYSTEM_PROMPT,
                    &prompt,
                    tasks::CASE_CONVERSION,
                    true,
                )
                .await?;

            let draft = match parse_draft(mcq, &response) {
                Ok(draft) => draft,
                Err(e) => {
                    warn!(
                        mcq_id = mcq.id,
                        attempt,
                        "Unparseable case response: {}", e
                    );
                    continue;
                }
            };

            let report = validate_draft(mcq, &draft, self.validation_threshold);
            if report.passed() {
                info!(
                    mcq_id = mcq.id,
                    attempt,
                    score = report.score,
                    "Generated case accepted"
                );
                return Ok(CaseOutcome::Generated(case_from_draft(&draft, &analysis)));
            }

            debug!(
                mcq_id = mcq.id,
                attempt,
                "Validation failed: {}",
                report.summary()
            );
        }

        warn!(
            mcq_id = mcq.id,
            attempts = self.max_attempts,
            "No generated case passed validation, using fallback case"
        );
        Ok(CaseOutcome::Fallback(fallback_case(mcq, &analysis)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::DEFAULT_TIMEOUT;
    use crate::mcq::McqOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const VALID_DRAFT: &str = r#"{"source_mcq_id": 21, "clinical_presentation": {
        "chief_complaint": "Painful blurred vision in the right eye",
        "history_present_illness": "A 30-year-old woman reports two weeks of painful vision loss in the right eye and new double vision.",
        "physical_examination": "Right internuclear ophthalmoplegia and a relative afferent pupillary defect."},
        "question_prompt": "What is the most likely diagnosis?",
        "core_concept_type": "diagnosis"}"#;

    const DRAFT_WITHOUT_HISTORY: &str = r#"{"source_mcq_id": 21, "clinical_presentation": {
        "chief_complaint": "Painful blurred vision in the right eye",
        "history_present_illness": ""},
        "question_prompt": "What is the most likely diagnosis?",
        "core_concept_type": "diagnosis"}"#;

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Local chat-completions endpoint answering with `replies` in order
    /// (the last one repeats). Returns the base URL and a request counter.
    async fn serve_replies(replies: Vec<&'static str>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let content = replies[n.min(replies.len() - 1)];
                let body = serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": content}}]
                })
                .to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}", addr), requests)
    }

    async fn converter_for(
        replies: Vec<&'static str>,
        max_attempts: u32,
    ) -> (LlmConverter, Arc<AtomicUsize>) {
        let (url, requests) = serve_replies(replies).await;
        let client = LlmClient::new(&url, "", "test", DEFAULT_TIMEOUT).unwrap();
        (
            LlmConverter::new(client, "gpt-4o-mini", max_attempts, 70.0),
            requests,
        )
    }

    fn mcq() -> Mcq {
        let mut mcq = Mcq::new(
            21,
            "A 30-year-old woman has optic neuritis and a right internuclear ophthalmoplegia. What is the most likely diagnosis?",
            "Neuroimmunology",
        );
        mcq.options = McqOptions::from_pairs([('A', "Multiple sclerosis"), ('B', "NMOSD")]);
        mcq.correct_answer = "A".to_string();
        mcq
    }

    #[test]
    fn test_prompt_contains_context() {
        let mcq = mcq();
        let analysis = QuestionAnalysis::of(&mcq);
        let prompt = build_prompt(&mcq, &analysis);
        assert!(prompt.contains("ORIGINAL MCQ (ID: 21)"));
        assert!(prompt.contains("Correct answer: Multiple sclerosis"));
        assert!(prompt.contains("- Patient: 30-year-old female"));
        assert!(prompt.contains("- Subspecialty keyword match: 0%"));
        assert!(prompt.contains("\"source_mcq_id\": 21"));
        assert!(prompt.contains("What is the most likely diagnosis?"));
    }

    #[test]
    fn test_parse_draft_corrects_id() {
        let response = r#"```json
{"source_mcq_id": 999, "clinical_presentation": {"chief_complaint": "Blurred vision",
 "history_present_illness": "Two weeks of painful vision loss."},
 "question_prompt": "What is the most likely diagnosis?", "core_concept_type": "diagnosis"}
```"#;
        let draft = parse_draft(&mcq(), response).unwrap();
        assert_eq!(draft.claimed_mcq_id(), Some(21));
        assert_eq!(draft.clinical_presentation.chief_complaint, "Blurred vision");
    }

    #[test]
    fn test_parse_draft_rejects_non_json() {
        let err = parse_draft(&mcq(), "Sorry, I can't do that").unwrap_err();
        assert!(matches!(err, ConversionError::Llm(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_conversion_error() {
        let client = LlmClient::new("http://127.0.0.1:9", "", "test", DEFAULT_TIMEOUT).unwrap();
        let converter = LlmConverter::new(client, "gpt-4o-mini", 1, 70.0);
        let err = converter.convert(&mcq()).await.unwrap_err();
        assert!(matches!(err, ConversionError::Llm(_)));
    }

    #[test]
    fn test_prompt_reports_specialty_match() {
        let mcq = Mcq::new(
            22,
            "A 24-year-old man has a focal seizure with postictal confusion. What is the diagnosis?",
            "Epilepsy",
        );
        let prompt = build_prompt(&mcq, &QuestionAnalysis::of(&mcq));
        // seizure, ictal, postictal out of five keywords
        assert!(prompt.contains("- Subspecialty keyword match: 60%"));
    }

    #[tokio::test]
    async fn test_valid_draft_is_generated_on_first_attempt() {
        let (converter, requests) = converter_for(vec![VALID_DRAFT], 3).await;
        let outcome = converter.convert(&mcq()).await.unwrap();

        assert!(!outcome.is_fallback());
        assert!(outcome.case().clinical_presentation.contains("right eye"));
        assert!(outcome
            .case()
            .clinical_presentation
            .contains("Examination: Right internuclear ophthalmoplegia"));
        assert_eq!(outcome.case().patient_demographics, "30-year-old female");
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_history_on_every_attempt_falls_back() {
        let (converter, requests) = converter_for(vec![DRAFT_WITHOUT_HISTORY], 3).await;
        let outcome = converter.convert(&mcq()).await.unwrap();

        assert!(outcome.is_fallback());
        assert!(outcome
            .case()
            .clinical_presentation
            .ends_with("presents to the neuroimmunology clinic with symptoms requiring evaluation."));
        assert_eq!(requests.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_retried() {
        let (converter, requests) =
            converter_for(vec!["Sorry, I can't produce that case.", VALID_DRAFT], 3).await;
        let outcome = converter.convert(&mcq()).await.unwrap();

        assert!(!outcome.is_fallback());
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }
}
