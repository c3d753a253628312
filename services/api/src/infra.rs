use metrics_exporter_prometheus::PrometheusHandle;
use recruitment::config::AssessmentConfig;
use recruitment::workflows::assessment::{QuestionBank, QuestionBankError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Configured bank file, falling back to the bank compiled into the binary.
pub(crate) fn load_bank(config: &AssessmentConfig) -> Result<Arc<QuestionBank>, QuestionBankError> {
    let bank = match &config.question_bank {
        Some(path) => {
            let bank = QuestionBank::from_path(path)?;
            info!(path = %path.display(), version = bank.version(), "question bank loaded");
            bank
        }
        None => QuestionBank::builtin()?,
    };
    Ok(Arc::new(bank))
}

/// `mm:ss` countdown label.
pub(crate) fn format_clock(remaining: std::time::Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(Duration::from_secs(1200)), "20:00");
        assert_eq!(format_clock(Duration::from_secs(65)), "01:05");
        assert_eq!(format_clock(Duration::ZERO), "00:00");
    }

    #[test]
    fn missing_bank_file_is_reported() {
        let config = AssessmentConfig {
            question_bank: Some("/nonexistent/questions.json".into()),
            ..AssessmentConfig::default()
        };
        assert!(matches!(load_bank(&config), Err(QuestionBankError::Io(_))));
    }

    #[test]
    fn builtin_bank_is_used_by_default() {
        let bank = load_bank(&AssessmentConfig::default()).expect("builtin bank loads");
        assert_eq!(bank.len(), 20);
    }
}
