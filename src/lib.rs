use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub mod client;
pub mod config;
pub mod i18n;
pub mod personal;
pub mod report;
pub mod settings;
pub mod telemetry;
pub mod wizard;

pub use client::{AuditApi, HttpAuditApi, Submission};
pub use i18n::{Catalog, Direction, Language};
pub use personal::{CompanySize, Field, PersonalInfo};
pub use report::Report;
pub use wizard::{View, Wizard};

static BUNDLED_AUDIT: &str = include_str!("../resources/audit.json");

/// The question dataset shipped with the binary.
pub static AUDIT: Lazy<AuditFramework> =
    Lazy::new(|| AuditFramework::parse(BUNDLED_AUDIT).expect("bundled audit dataset is valid"));

/// Text that is either the same in every language or keyed by language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedText {
    /// Picks the variant for `lang`.
    ///
    /// Regional codes such as `fr-CA` resolve to their base language. Missing
    /// translations fall back to English, then French, then whichever entry
    /// sorts first.
    pub fn localize(&self, lang: &str) -> &str {
        match self {
            LocalizedText::Plain(text) => text,
            LocalizedText::Localized(values) => {
                let base = lang.split('-').next().unwrap_or(lang);
                [base, "en", "fr"]
                    .iter()
                    .find_map(|code| values.get(*code))
                    .or_else(|| values.values().next())
                    .map(String::as_str)
                    .unwrap_or("")
            }
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        LocalizedText::Plain(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: u8,
    pub label: LocalizedText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: LocalizedText,
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn option(&self, value: u8) -> Option<&AnswerOption> {
        self.options.iter().find(|option| option.value == value)
    }

    pub fn accepts(&self, value: u8) -> bool {
        self.option(value).is_some()
    }
}

/// A thematic group of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub id: u32,
    pub title: LocalizedText,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct AuditDocument {
    audit_framework: AuditFramework,
}

/// Master representation of the audit questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFramework {
    pub axes: Vec<Axis>,
}

impl AuditFramework {
    /// Parses a dataset document of the form `{"audit_framework": {"axes": [...]}}`.
    pub fn parse(json: &str) -> Result<Self, Error> {
        let document: AuditDocument = serde_json::from_str(json)?;
        document.audit_framework.checked()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let document: AuditDocument = serde_json::from_reader(reader)?;
        document.audit_framework.checked()
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        let framework = Self::from_reader(reader)?;
        tracing::debug!(
            path = %path.display(),
            axes = framework.axes.len(),
            questions = framework.total_questions(),
            "Audit dataset loaded"
        );
        Ok(framework)
    }

    fn checked(self) -> Result<Self, Error> {
        self.check()?;
        Ok(self)
    }

    /// Rejects datasets the wizard cannot walk through.
    pub fn check(&self) -> Result<(), Error> {
        if self.axes.is_empty() {
            return Err(Error::InvalidDataset("no axis defined".into()));
        }
        let mut seen = HashSet::new();
        for axis in &self.axes {
            if axis.questions.is_empty() {
                return Err(Error::InvalidDataset(format!(
                    "axis {} has no question",
                    axis.id
                )));
            }
            for question in &axis.questions {
                if question.options.is_empty() {
                    return Err(Error::InvalidDataset(format!(
                        "question {} has no option",
                        question.id
                    )));
                }
                // a zero value would read as "unanswered"
                if question.accepts(0) {
                    return Err(Error::InvalidDataset(format!(
                        "question {} uses 0 as an option value",
                        question.id
                    )));
                }
                if !seen.insert(question.id.as_str()) {
                    return Err(Error::InvalidDataset(format!(
                        "duplicate question id {}",
                        question.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn axis(&self, index: usize) -> Option<&Axis> {
        self.axes.get(index)
    }

    pub fn total_questions(&self) -> usize {
        self.axes.iter().map(|axis| axis.questions.len()).sum()
    }

    /// 1-based position of a question across all axes.
    pub fn question_number(&self, axis_index: usize, question_index: usize) -> usize {
        self.axes
            .iter()
            .take(axis_index)
            .map(|axis| axis.questions.len())
            .sum::<usize>()
            + question_index
            + 1
    }

    pub fn iter_questions(&self) -> impl Iterator<Item = &Question> {
        self.axes.iter().flat_map(|axis| axis.questions.iter())
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.iter_questions().nth(index)
    }

    /// Looks a question up by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.iter_questions().find(|question| question.id == id)
    }

    /// All questions in wizard order, as sent to the report API.
    pub fn questions(&self) -> Vec<&Question> {
        self.iter_questions().collect()
    }
}

/// Answers keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerStore {
    values: BTreeMap<String, u8>,
}

impl AnswerStore {
    /// Stores an answer. Only values offered by the question are accepted;
    /// answering again replaces the previous value.
    pub fn insert(&mut self, question: &Question, value: u8) -> Result<(), Error> {
        if !question.accepts(value) {
            return Err(Error::IllegalAnswer);
        }
        self.values.insert(question.id.clone(), value);
        Ok(())
    }

    /// Stores an answer for the question with the given id.
    pub fn record(
        &mut self,
        framework: &AuditFramework,
        question_id: &str,
        value: u8,
    ) -> Result<(), Error> {
        let question = framework
            .question(question_id)
            .ok_or(Error::IllegalQuestion)?;
        self.insert(question, value)
    }

    pub fn get(&self, question_id: &str) -> Option<u8> {
        self.values.get(question_id).copied()
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.values.contains_key(question_id)
    }

    pub fn answered(&self) -> usize {
        self.values.len()
    }

    pub fn progress_percentage(&self, total: usize) -> u8 {
        if total == 0 {
            return 0;
        }
        (self.answered() as f64 / total as f64 * 100.0)
            .round()
            .min(100.0) as u8
    }

    pub fn is_complete(&self, framework: &AuditFramework) -> bool {
        framework
            .iter_questions()
            .all(|question| self.is_answered(&question.id))
    }

    pub fn ensure_complete(&self, framework: &AuditFramework) -> Result<(), Error> {
        if self.is_complete(framework) {
            Ok(())
        } else {
            Err(Error::NotFulfilled)
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// One respondent read from a bulk CSV file.
#[derive(Debug, Clone)]
pub struct BulkRow {
    pub line: u64,
    pub personal: PersonalInfo,
    pub language: Language,
    pub answers: AnswerStore,
}

impl BulkRow {
    pub fn submission<'a>(&'a self, framework: &'a AuditFramework) -> Result<Submission<'a>, Error> {
        Submission::new(framework, &self.answers, &self.personal, self.language)
    }
}

/// Reads respondents from CSV.
///
/// Contact columns use the submission field names (`fullName`, `companyName`,
/// `sector`, `size`, `phone`, `email`) plus an optional `language` column;
/// every other column is a question id holding the chosen option value. Empty
/// answer cells are left unanswered.
pub fn read_bulk<'a, R: Read + 'a>(
    reader: R,
    framework: &'a AuditFramework,
) -> Result<impl Iterator<Item = Result<BulkRow, Error>> + 'a, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    Ok(reader
        .into_records()
        .map(move |record| parse_bulk_record(&headers, &record?, framework)))
}

fn parse_bulk_record(
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
    framework: &AuditFramework,
) -> Result<BulkRow, Error> {
    let mut row = BulkRow {
        line: record.position().map(|p| p.line()).unwrap_or_default(),
        personal: PersonalInfo::default(),
        language: Language::default(),
        answers: AnswerStore::default(),
    };
    for (header, value) in headers.iter().zip(record.iter()) {
        if let Some(field) = Field::from_name(header) {
            row.personal.set(field, value)?;
            continue;
        }
        if header == "language" {
            if !value.is_empty() {
                row.language = value.parse()?;
            }
            continue;
        }
        if value.is_empty() {
            continue;
        }
        let value = value.parse::<u8>().map_err(|_| Error::IllegalAnswer)?;
        row.answers.record(framework, header, value)?;
    }
    Ok(row)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No question has the given id.
    #[error("unknown question")]
    IllegalQuestion,
    /// Value outside the question's options.
    #[error("answer is not one of the question's options")]
    IllegalAnswer,
    /// At least one question is unanswered.
    #[error("not every question has been answered")]
    NotFulfilled,
    #[error("invalid audit dataset: {0}")]
    InvalidDataset(String),
    #[error("a full name and a valid email address are required")]
    InvalidPersonal,
    #[error("invalid value '{value}' for {field}")]
    InvalidField { field: &'static str, value: String },
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),
    #[error("a submission is not possible right now")]
    SubmitUnavailable,
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Api(String),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Telemetry(#[from] telemetry::TelemetryError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> AuditFramework {
        AuditFramework::parse(
            r#"{"audit_framework": {"axes": [
                {"id": 1, "title": "Data", "questions": [
                    {"id": "d1", "text": "Q1", "options": [{"value": 1, "label": "No"}, {"value": 2, "label": "Yes"}]},
                    {"id": "d2", "text": "Q2", "options": [{"value": 1, "label": "No"}, {"value": 2, "label": "Yes"}]}
                ]},
                {"id": 2, "title": "People", "questions": [
                    {"id": "p1", "text": "Q3", "options": [{"value": 1, "label": "No"}, {"value": 2, "label": "Yes"}]}
                ]}
            ]}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_bundled_dataset() {
        assert_eq!(AUDIT.axes.len(), 5);
        assert_eq!(AUDIT.total_questions(), 15);
        assert!(AUDIT.check().is_ok());
        for question in AUDIT.iter_questions() {
            assert_eq!(question.options.len(), 5);
            assert!(!question.text.localize("ar").is_empty());
        }
    }

    #[test]
    fn test_localize() {
        let text = LocalizedText::Localized(BTreeMap::from([
            ("en".to_string(), "Data".to_string()),
            ("fr".to_string(), "Données".to_string()),
        ]));
        assert_eq!(text.localize("fr"), "Données");
        assert_eq!(text.localize("fr-CA"), "Données");
        assert_eq!(text.localize("ar"), "Data");

        let french_only =
            LocalizedText::Localized(BTreeMap::from([("fr".to_string(), "Oui".to_string())]));
        assert_eq!(french_only.localize("ar"), "Oui");

        let other = LocalizedText::Localized(BTreeMap::from([
            ("es".to_string(), "Sí".to_string()),
            ("de".to_string(), "Ja".to_string()),
        ]));
        assert_eq!(other.localize("en"), "Ja");

        assert_eq!(LocalizedText::Localized(BTreeMap::new()).localize("en"), "");
        assert_eq!(LocalizedText::from("plain").localize("ar"), "plain");
    }

    #[test]
    fn test_get() {
        let framework = sample();
        assert_eq!(Some("d1"), framework.get(0).map(|q| q.id.as_str()));
        assert_eq!(Some("p1"), framework.get(2).map(|q| q.id.as_str()));
        assert_eq!(None, framework.get(3).map(|q| q.id.as_str()));
    }

    #[test]
    fn test_question() {
        let framework = sample();
        assert_eq!(Some("d2"), framework.question("d2").map(|q| q.id.as_str()));
        assert!(framework.question("x9").is_none());
        assert_eq!(framework.questions().len(), 3);
    }

    #[test]
    fn test_question_number() {
        let framework = sample();
        assert_eq!(framework.question_number(0, 0), 1);
        assert_eq!(framework.question_number(0, 1), 2);
        assert_eq!(framework.question_number(1, 0), 3);
    }

    #[test]
    fn test_rejects_unusable_datasets() {
        let empty = r#"{"audit_framework": {"axes": []}}"#;
        assert!(matches!(
            AuditFramework::parse(empty),
            Err(Error::InvalidDataset(_))
        ));

        let no_question = r#"{"audit_framework": {"axes": [{"id": 1, "title": "A", "questions": []}]}}"#;
        assert!(matches!(
            AuditFramework::parse(no_question),
            Err(Error::InvalidDataset(_))
        ));

        let duplicate = r#"{"audit_framework": {"axes": [{"id": 1, "title": "A", "questions": [
            {"id": "q", "text": "1", "options": [{"value": 1, "label": "a"}]},
            {"id": "q", "text": "2", "options": [{"value": 1, "label": "a"}]}
        ]}]}}"#;
        assert!(matches!(
            AuditFramework::parse(duplicate),
            Err(Error::InvalidDataset(_))
        ));

        let zero = r#"{"audit_framework": {"axes": [{"id": 1, "title": "A", "questions": [
            {"id": "q", "text": "1", "options": [{"value": 0, "label": "a"}]}
        ]}]}}"#;
        assert!(matches!(
            AuditFramework::parse(zero),
            Err(Error::InvalidDataset(_))
        ));

        assert!(matches!(
            AuditFramework::parse("{"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_answer_store() {
        let framework = sample();
        let mut store = AnswerStore::default();
        assert!(store.record(&framework, "d1", 2).is_ok());
        assert!(matches!(
            store.record(&framework, "d1", 3),
            Err(Error::IllegalAnswer)
        ));
        assert!(matches!(
            store.record(&framework, "zz", 1),
            Err(Error::IllegalQuestion)
        ));
        assert!(store.record(&framework, "d1", 1).is_ok());
        assert_eq!(store.get("d1"), Some(1));
        assert_eq!(store.answered(), 1);
    }

    #[test]
    fn test_progress_percentage() {
        let framework = sample();
        let mut store = AnswerStore::default();
        assert_eq!(store.progress_percentage(3), 0);
        store.record(&framework, "d1", 1).unwrap();
        assert_eq!(store.progress_percentage(3), 33);
        store.record(&framework, "d2", 1).unwrap();
        assert_eq!(store.progress_percentage(3), 67);
        store.record(&framework, "p1", 1).unwrap();
        assert_eq!(store.progress_percentage(3), 100);
        assert_eq!(store.progress_percentage(0), 0);
    }

    #[test]
    fn test_answer_not_fulfilled() {
        let framework = sample();
        let mut store = AnswerStore::default();
        store.record(&framework, "d1", 1).unwrap();
        store.record(&framework, "d2", 2).unwrap();
        assert!(matches!(
            store.ensure_complete(&framework),
            Err(Error::NotFulfilled)
        ));
        store.record(&framework, "p1", 2).unwrap();
        assert!(store.ensure_complete(&framework).is_ok());
        store.clear();
        assert_eq!(store.answered(), 0);
    }

    #[test]
    fn test_answers_serialize_as_map() {
        let framework = sample();
        let mut store = AnswerStore::default();
        store.record(&framework, "d2", 2).unwrap();
        store.record(&framework, "d1", 1).unwrap();
        assert_eq!(
            serde_json::to_string(&store).unwrap(),
            r#"{"d1":1,"d2":2}"#
        );
    }

    #[test]
    fn test_read_bulk() {
        let framework = sample();
        let data = "fullName,email,size,language,d1,d2,p1\n\
                    Ada Lovelace,ada@example.com,s2,fr,1,2,2\n\
                    Bob,bob@example.com,,,1,,\n\
                    Eve,eve@example.com,s1,en,1,7,1\n";
        let rows = read_bulk(data.as_bytes(), &framework)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(rows.len(), 3);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.personal.full_name, "Ada Lovelace");
        assert_eq!(first.personal.size, Some(CompanySize::S2));
        assert_eq!(first.language, Language::Fr);
        assert!(first.answers.is_complete(&framework));
        assert!(first.submission(&framework).is_ok());

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.language, Language::En);
        assert_eq!(second.answers.answered(), 1);
        assert!(matches!(
            second.submission(&framework),
            Err(Error::NotFulfilled)
        ));

        assert!(matches!(rows[2], Err(Error::IllegalAnswer)));
    }

    #[test]
    fn test_read_bulk_unknown_question_column() {
        let framework = sample();
        let data = "fullName,email,zz\nAda,ada@example.com,1\n";
        let rows = read_bulk(data.as_bytes(), &framework)
            .unwrap()
            .collect::<Vec<_>>();
        assert!(matches!(rows[0], Err(Error::IllegalQuestion)));
    }
}
