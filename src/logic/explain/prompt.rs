//! Root-cause prompt rendering

use crate::constants::NARRATIVE_MAX_RECORDS;
use crate::logic::ingest::LogRecord;

/// Numbered block of the first records: `n. [timestamp] LEVEL - service: message`
pub fn format_records(records: &[LogRecord]) -> String {
    records
        .iter()
        .take(NARRATIVE_MAX_RECORDS)
        .enumerate()
        .map(|(i, r)| format!("{}. [{}] {} - {}: {}", i + 1, r.timestamp, r.level, r.service, r.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Logs and context are substituted once, so braces in either are kept verbatim
pub fn build_prompt(records: &[LogRecord], context: &str) -> String {
    format!(
        "You are an expert DevOps engineer analyzing system logs for root cause analysis.

Given the following logs:
{logs}

Additional context: {context}

Please provide:
1. A summary of the issue
2. Likely root cause(s)
3. Recommended actions to resolve the issue
4. Preventive measures

Keep your analysis concise and actionable.",
        logs = format_records(records),
        context = context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ingest::LogLevel;

    #[test]
    fn test_format_records() {
        let records = vec![
            LogRecord::new(LogLevel::Error, "api-gateway", "HTTP 502").at("2024-01-15 08:00:01"),
            LogRecord::new(LogLevel::Info, "auth", "ok").at("2024-01-15 08:00:02"),
        ];
        assert_eq!(
            format_records(&records),
            "1. [2024-01-15T08:00:01] ERROR - api-gateway: HTTP 502\n2. [2024-01-15T08:00:02] INFO - auth: ok"
        );
    }

    #[test]
    fn test_format_limits_records() {
        let records: Vec<LogRecord> = (0..25)
            .map(|i| LogRecord::new(LogLevel::Info, "svc", format!("event {}", i)))
            .collect();
        let block = format_records(&records);
        assert_eq!(block.lines().count(), NARRATIVE_MAX_RECORDS);
        assert!(block.ends_with("svc: event 9"));
    }

    #[test]
    fn test_build_prompt() {
        let records = vec![LogRecord::new(LogLevel::Critical, "database", "pool exhausted")];
        let prompt = build_prompt(&records, "deploy at 08:00");
        assert!(prompt.contains("CRITICAL - database: pool exhausted"));
        assert!(prompt.contains("Additional context: deploy at 08:00"));
        assert!(prompt.contains("4. Preventive measures"));
    }

    #[test]
    fn test_placeholders_in_logs_kept_verbatim() {
        let records = vec![LogRecord::new(
            LogLevel::Error,
            "templater",
            "render failed: unknown key {context} in {logs}",
        )];
        let prompt = build_prompt(&records, "SECRET-CONTEXT");

        assert!(prompt.contains("templater: render failed: unknown key {context} in {logs}"));
        assert_eq!(prompt.matches("SECRET-CONTEXT").count(), 1);
        assert!(prompt.contains("Additional context: SECRET-CONTEXT"));
    }
}
