//! Narrative Summarizer
//!
//! Best-effort root-cause text. The generative backend is tried first;
//! any failure falls back to `fallback_summary`, which never calls out.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::prompt::build_prompt;
use super::types::{Narrative, NarrativeSource};
use crate::constants::NARRATIVE_MAX_RECORDS;
use crate::logic::backend::TextGenerator;
use crate::logic::ingest::LogRecord;

const NO_CRITICAL_ISSUES: &str = "**Analysis Summary:**
No critical errors detected in the provided logs. System appears to be operating normally.

**Recommended Actions:**
- Continue monitoring for anomalies
- Review warning-level logs if present";

#[derive(Clone, Default)]
pub struct NarrativeSummarizer {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl NarrativeSummarizer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Summarize the first records (never fails)
    pub fn summarize(&self, records: &[LogRecord], context: &str) -> Narrative {
        if let Some(generator) = &self.generator {
            match generator.complete(&build_prompt(records, context)) {
                Ok(text) if !text.trim().is_empty() => {
                    return Narrative {
                        text,
                        source: NarrativeSource::Generated,
                    };
                }
                Ok(_) => log::warn!("{} returned an empty analysis, using fallback", generator.name()),
                Err(e) => log::warn!("{} analysis failed ({}), using fallback", generator.name(), e),
            }
        }

        Narrative {
            text: fallback_summary(records),
            source: NarrativeSource::Fallback,
        }
    }
}

impl std::fmt::Debug for NarrativeSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeSummarizer")
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .finish()
    }
}

/// Rule-based summary of the first records
pub fn fallback_summary(records: &[LogRecord]) -> String {
    let errors: Vec<&LogRecord> = records
        .iter()
        .take(NARRATIVE_MAX_RECORDS)
        .filter(|r| r.level.is_error())
        .collect();

    if errors.is_empty() {
        return NO_CRITICAL_ISSUES.to_string();
    }

    let services: BTreeSet<&str> = errors.iter().map(|r| r.service.as_str()).collect();
    let service_count = services.len();
    let service_list = services.into_iter().collect::<Vec<_>>().join(", ");

    format!(
        "**Analysis Summary:**
Detected {count} error/critical log entries across {service_count} service(s): {services}

**Likely Root Causes:**
- Service failures or exceptions in: {services}
- Potential issues: connectivity problems, resource exhaustion, or configuration errors

**Recommended Actions:**
1. Check service health for: {services}
2. Review error messages for specific failure patterns
3. Verify resource availability (CPU, memory, disk)
4. Check for recent configuration changes

**Preventive Measures:**
- Implement retry mechanisms with exponential backoff
- Add comprehensive error handling
- Set up proactive monitoring and alerting
- Review and optimize resource allocation",
        count = errors.len(),
        service_count = service_count,
        services = service_list,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::backend::BackendError;
    use crate::logic::ingest::LogLevel;
    use parking_lot::Mutex;

    struct FakeGenerator {
        reply: Result<String, BackendError>,
        prompts: Mutex<Vec<String>>,
    }

    impl TextGenerator for FakeGenerator {
        fn name(&self) -> &str {
            "fake"
        }

        fn complete(&self, prompt: &str) -> Result<String, BackendError> {
            self.prompts.lock().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn generator(reply: Result<String, BackendError>) -> Arc<FakeGenerator> {
        Arc::new(FakeGenerator {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_no_errors_fixed_summary() {
        let records = vec![
            LogRecord::new(LogLevel::Info, "auth", "ok"),
            LogRecord::new(LogLevel::Warning, "auth", "slow"),
        ];
        let first = fallback_summary(&records);
        assert_eq!(first, fallback_summary(&records));
        assert!(first.contains("No critical errors detected"));
        assert_eq!(fallback_summary(&[]), first);
    }

    #[test]
    fn test_fallback_names_sorted_services() {
        let records = vec![
            LogRecord::new(LogLevel::Critical, "payment-service", "Exception: connection failed"),
            LogRecord::new(LogLevel::Error, "database", "pool exhausted"),
            LogRecord::new(LogLevel::Error, "payment-service", "timeout"),
            LogRecord::new(LogLevel::Info, "auth", "ok"),
        ];
        let text = fallback_summary(&records);
        assert!(text.contains("Detected 3 error/critical log entries across 2 service(s): database, payment-service"));
        assert!(!text.contains("auth"));
    }

    #[test]
    fn test_fallback_uses_first_ten() {
        let mut records: Vec<LogRecord> = (0..10)
            .map(|_| LogRecord::new(LogLevel::Info, "auth", "ok"))
            .collect();
        records.push(LogRecord::new(LogLevel::Critical, "late-service", "down"));
        assert_eq!(fallback_summary(&records), NO_CRITICAL_ISSUES);
    }

    #[test]
    fn test_generated_text_returned_verbatim() {
        let fake = generator(Ok("Root cause: DNS".to_string()));
        let summarizer = NarrativeSummarizer::new(Some(fake.clone()));
        let records = vec![LogRecord::new(LogLevel::Error, "api", "lookup failed")];

        let narrative = summarizer.summarize(&records, "after deploy");
        assert_eq!(narrative.text, "Root cause: DNS");
        assert_eq!(narrative.source, NarrativeSource::Generated);

        let prompts = fake.prompts.lock();
        assert!(prompts[0].contains("1. ["));
        assert!(prompts[0].contains("ERROR - api: lookup failed"));
        assert!(prompts[0].contains("after deploy"));
    }

    #[test]
    fn test_backend_failure_falls_back() {
        let fake = generator(Err(BackendError::NetworkError {
            message: "connection refused".into(),
        }));
        let summarizer = NarrativeSummarizer::new(Some(fake));
        let records = vec![LogRecord::new(LogLevel::Critical, "database", "down")];

        let narrative = summarizer.summarize(&records, "");
        assert_eq!(narrative.source, NarrativeSource::Fallback);
        assert_eq!(narrative.text, fallback_summary(&records));
    }

    #[test]
    fn test_empty_generation_falls_back() {
        let summarizer = NarrativeSummarizer::new(Some(generator(Ok("   ".to_string()))));
        let narrative = summarizer.summarize(&[LogRecord::new(LogLevel::Info, "a", "b")], "");
        assert_eq!(narrative.source, NarrativeSource::Fallback);
    }

    #[test]
    fn test_no_generator_uses_fallback() {
        let summarizer = NarrativeSummarizer::default();
        assert!(!summarizer.has_generator());
        let narrative = summarizer.summarize(&[], "");
        assert_eq!(narrative.text, NO_CRITICAL_ISSUES);
    }
}
