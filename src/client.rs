//! Submission of a completed audit to the report API.
//!
//! Blocking reqwest client: one POST per submit, no retry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::i18n::Language;
use crate::personal::PersonalInfo;
use crate::report::Report;
use crate::{AnswerStore, AuditFramework, Error, Question};

pub const SUBMIT_PATH: &str = "/api/audit/submit";
pub const GENERIC_FAILURE: &str = "Failed to generate report";
pub const UNEXPECTED_FAILURE: &str = "An unexpected error occurred. Please try again.";

/// Request body for `POST /api/audit/submit`.
#[derive(Debug, Serialize)]
pub struct Submission<'a> {
    pub answers: &'a AnswerStore,
    pub personal: &'a PersonalInfo,
    pub questions: Vec<&'a Question>,
    pub language: Language,
}

impl<'a> Submission<'a> {
    /// Requires every question answered and valid contact details.
    pub fn new(
        framework: &'a AuditFramework,
        answers: &'a AnswerStore,
        personal: &'a PersonalInfo,
        language: Language,
    ) -> Result<Self, Error> {
        answers.ensure_complete(framework)?;
        if !personal.is_valid() {
            return Err(Error::InvalidPersonal);
        }
        Ok(Self {
            answers,
            personal,
            questions: framework.questions(),
            language,
        })
    }
}

/// Anything able to turn a submission into a report.
pub trait AuditApi {
    fn submit(&self, submission: &Submission<'_>) -> Result<Report, Error>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    report: Option<Report>,
    error: Option<String>,
}

/// Report API client (blocking).
#[derive(Clone)]
pub struct HttpAuditApi {
    http: reqwest::blocking::Client,
    api_base: String,
}

impl HttpAuditApi {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("simple_audit/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.api_base, SUBMIT_PATH)
    }
}

impl AuditApi for HttpAuditApi {
    fn submit(&self, submission: &Submission<'_>) -> Result<Report, Error> {
        let url = self.endpoint();
        info!(
            url = %url,
            answers = submission.answers.answered(),
            language = %submission.language,
            "Submitting audit"
        );

        let response = self
            .http
            .post(&url)
            .json(submission)
            .send()
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| Error::Network(e.to_string()))?;
        let report = interpret_response(status, &body)?;
        info!(status, axes = report.axes.len(), "Report received");
        Ok(report)
    }
}

/// Maps the API's `{success, report, error}` envelope onto a result.
pub fn interpret_response(status: u16, body: &str) -> Result<Report, Error> {
    let parsed: SubmitResponse = serde_json::from_str(body).map_err(|e| {
        warn!(status, error = %e, "Report API returned an unreadable body");
        Error::Api(e.to_string())
    })?;

    if !(200..300).contains(&status) || !parsed.success {
        let message = parsed
            .error
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        warn!(status, error = %message, "Report API rejected the submission");
        return Err(Error::Api(message));
    }

    parsed
        .report
        .ok_or_else(|| Error::Api(GENERIC_FAILURE.to_string()))
}

/// Text shown to the respondent when a submission fails.
pub fn failure_message(err: &Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNEXPECTED_FAILURE.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::AUDIT;

    const REPORT: &str = r#"{"resume_executif": "ok", "niveau_maturite": "Initial", "axes": [],
        "analyse_globale": "", "feuille_de_route": {"actions_prioritaires": [], "conclusion": ""}}"#;

    fn answered() -> AnswerStore {
        let mut answers = AnswerStore::default();
        for question in AUDIT.iter_questions() {
            answers.insert(question, 3).unwrap();
        }
        answers
    }

    fn personal() -> PersonalInfo {
        PersonalInfo {
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_interpret_success() {
        let body = format!(r#"{{"success": true, "report": {REPORT}}}"#);
        let report = interpret_response(200, &body).unwrap();
        assert_eq!(report.maturity_level, "Initial");
    }

    #[test]
    fn test_interpret_failures() {
        let err = interpret_response(500, r#"{"success": false, "error": "LLM quota exceeded"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "LLM quota exceeded");

        let err = interpret_response(200, r#"{"success": false}"#).unwrap_err();
        assert_eq!(err.to_string(), GENERIC_FAILURE);

        let err = interpret_response(200, r#"{"success": false, "error": ""}"#).unwrap_err();
        assert_eq!(err.to_string(), GENERIC_FAILURE);

        let body = format!(r#"{{"success": true, "report": {REPORT}}}"#);
        let err = interpret_response(502, &body).unwrap_err();
        assert_eq!(err.to_string(), GENERIC_FAILURE);

        let err = interpret_response(200, r#"{"success": true}"#).unwrap_err();
        assert_eq!(err.to_string(), GENERIC_FAILURE);

        assert!(matches!(
            interpret_response(502, "<html>Bad Gateway</html>"),
            Err(Error::Api(_))
        ));
    }

    #[test]
    fn test_failure_message() {
        assert_eq!(
            failure_message(&Error::Api(String::new())),
            UNEXPECTED_FAILURE
        );
        assert_eq!(
            failure_message(&Error::Network("connection refused".into())),
            "network error: connection refused"
        );
    }

    #[test]
    fn test_submission_requirements() {
        let answers = answered();
        let info = personal();
        assert!(Submission::new(&AUDIT, &answers, &info, Language::En).is_ok());

        let partial = AnswerStore::default();
        assert!(matches!(
            Submission::new(&AUDIT, &partial, &info, Language::En),
            Err(Error::NotFulfilled)
        ));

        let anonymous = PersonalInfo::default();
        assert!(matches!(
            Submission::new(&AUDIT, &answers, &anonymous, Language::En),
            Err(Error::InvalidPersonal)
        ));
    }

    #[test]
    fn test_submission_body() {
        let answers = answered();
        let info = personal();
        let submission = Submission::new(&AUDIT, &answers, &info, Language::Ar).unwrap();
        let json = serde_json::to_value(&submission).unwrap();

        assert_eq!(json["language"], "ar");
        assert_eq!(json["personal"]["fullName"], "Ada");
        assert_eq!(json["personal"]["size"], "");
        assert_eq!(json["answers"]["a1_q1"], 3);
        assert_eq!(json["questions"].as_array().unwrap().len(), 15);
        assert_eq!(json["questions"][0]["id"], "a1_q1");
        assert_eq!(json["questions"][0]["options"][0]["value"], 1);
        assert!(json["questions"][0]["text"]["fr"].is_string());
    }

    #[test]
    fn test_endpoint() {
        let api = HttpAuditApi::new("http://localhost:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.endpoint(), "http://localhost:5000/api/audit/submit");
    }
}
