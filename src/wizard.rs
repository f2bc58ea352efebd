//! Step navigation for the question wizard.

use tracing::{debug, error, info};

use crate::client::{failure_message, AuditApi, Submission};
use crate::i18n::Language;
use crate::personal::PersonalInfo;
use crate::report::Report;
use crate::{AnswerStore, AuditFramework, Axis, Error, Question};

/// What the wizard is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Questions,
    PersonalForm,
    Report,
}

#[derive(Debug, Clone)]
pub struct Wizard<'a> {
    framework: &'a AuditFramework,
    axis_index: usize,
    question_index: usize,
    answers: AnswerStore,
    show_personal_form: bool,
    submitted: bool,
    loading: bool,
    report: Option<Report>,
    error: Option<String>,
    personal: PersonalInfo,
}

impl<'a> Wizard<'a> {
    pub fn new(framework: &'a AuditFramework) -> Result<Self, Error> {
        framework.check()?;
        Ok(Self {
            framework,
            axis_index: 0,
            question_index: 0,
            answers: AnswerStore::default(),
            show_personal_form: false,
            submitted: false,
            loading: false,
            report: None,
            error: None,
            personal: PersonalInfo::default(),
        })
    }

    pub fn view(&self) -> View {
        match (self.submitted, self.show_personal_form) {
            (true, _) if self.report.is_some() => View::Report,
            (false, true) => View::PersonalForm,
            _ => View::Questions,
        }
    }

    pub fn framework(&self) -> &'a AuditFramework {
        self.framework
    }

    pub fn axis_index(&self) -> usize {
        self.axis_index
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn current_axis(&self) -> &'a Axis {
        &self.framework.axes[self.axis_index]
    }

    pub fn current_question(&self) -> &'a Question {
        &self.current_axis().questions[self.question_index]
    }

    pub fn question_number(&self) -> usize {
        self.framework
            .question_number(self.axis_index, self.question_index)
    }

    pub fn total_questions(&self) -> usize {
        self.framework.total_questions()
    }

    pub fn progress_percentage(&self) -> u8 {
        self.answers.progress_percentage(self.total_questions())
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    /// The option chosen for the current question, if any.
    pub fn selected(&self) -> Option<u8> {
        self.answers.get(&self.current_question().id)
    }

    /// Records an answer for the current question. Never advances.
    pub fn answer(&mut self, value: u8) -> Result<(), Error> {
        let question = self.current_question();
        self.answers.insert(question, value)?;
        debug!(question = %question.id, value, "Answer recorded");
        Ok(())
    }

    pub fn can_advance(&self) -> bool {
        self.view() == View::Questions && self.selected().is_some()
    }

    pub fn is_last_question(&self) -> bool {
        self.axis_index == self.framework.axes.len() - 1
            && self.question_index == self.current_axis().questions.len() - 1
    }

    /// Moves to the next question, the next axis, or the personal form after
    /// the last question.
    pub fn next(&mut self) -> Result<(), Error> {
        if !self.can_advance() {
            return Err(Error::NotFulfilled);
        }
        if self.question_index < self.current_axis().questions.len() - 1 {
            self.question_index += 1;
        } else if self.axis_index < self.framework.axes.len() - 1 {
            self.axis_index += 1;
            self.question_index = 0;
        } else {
            self.show_personal_form = true;
        }
        Ok(())
    }

    pub fn can_go_previous(&self) -> bool {
        match self.view() {
            View::Questions => self.axis_index > 0 || self.question_index > 0,
            View::PersonalForm => !self.loading,
            View::Report => false,
        }
    }

    /// Steps back one question; from the personal form, returns to the last
    /// question.
    pub fn previous(&mut self) {
        if !self.can_go_previous() {
            return;
        }
        if self.show_personal_form {
            self.show_personal_form = false;
            return;
        }
        if self.question_index > 0 {
            self.question_index -= 1;
        } else if self.axis_index > 0 {
            self.axis_index -= 1;
            self.question_index = self.current_axis().questions.len() - 1;
        }
    }

    pub fn personal(&self) -> &PersonalInfo {
        &self.personal
    }

    pub fn personal_mut(&mut self) -> &mut PersonalInfo {
        &mut self.personal
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_submit(&self) -> bool {
        self.view() == View::PersonalForm && self.personal.is_valid() && !self.loading
    }

    pub fn submission(&self, language: Language) -> Result<Submission<'_>, Error> {
        Submission::new(self.framework, &self.answers, &self.personal, language)
    }

    /// Enters the loading state and clears any previous error.
    pub fn begin_submit(&mut self) -> Result<(), Error> {
        if !self.can_submit() {
            return Err(Error::SubmitUnavailable);
        }
        self.loading = true;
        self.error = None;
        Ok(())
    }

    pub fn finish_submit(&mut self, result: Result<Report, Error>) {
        self.loading = false;
        match result {
            Ok(report) => {
                info!(axes = report.axes.len(), "Audit report ready");
                self.report = Some(report);
                self.submitted = true;
            }
            Err(e) => {
                error!(error = %e, "Error submitting audit");
                self.error = Some(failure_message(&e));
            }
        }
    }

    /// Runs one submission against `api`. Returns whether a report was received.
    pub fn submit<A: AuditApi + ?Sized>(&mut self, api: &A, language: Language) -> bool {
        if self.begin_submit().is_err() {
            return false;
        }
        let result = self
            .submission(language)
            .and_then(|submission| api.submit(&submission));
        self.finish_submit(result);
        self.submitted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Starts over from the first question with nothing filled in.
    pub fn reset(&mut self) {
        self.report = None;
        self.submitted = false;
        self.loading = false;
        self.error = None;
        self.answers.clear();
        self.axis_index = 0;
        self.question_index = 0;
        self.show_personal_form = false;
        self.personal.clear();
    }
}
