//! The audit report returned by the report API and its text rendering.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::i18n::Catalog;
use crate::Error;

const MAX_SCORE: f64 = 5.0;
const BAR_WIDTH: usize = 30;
const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "resume_executif", default)]
    pub executive_summary: String,
    #[serde(rename = "niveau_maturite", default)]
    pub maturity_level: String,
    #[serde(default)]
    pub axes: Vec<AxisReport>,
    #[serde(rename = "analyse_globale", default)]
    pub global_analysis: String,
    #[serde(rename = "feuille_de_route", default)]
    pub roadmap: Roadmap,
    #[serde(rename = "generatedAt", default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisReport {
    #[serde(default)]
    pub id: u32,
    #[serde(rename = "titre", default)]
    pub title: String,
    #[serde(default)]
    pub score: f64,
    #[serde(rename = "forces", default)]
    pub strengths: Vec<String>,
    #[serde(rename = "faiblesses", default)]
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    #[serde(rename = "actions_prioritaires", default)]
    pub priority_actions: Vec<String>,
    #[serde(default)]
    pub conclusion: String,
}

/// Five-step scale used to qualify an axis score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Critical,
    Low,
    Moderate,
    Good,
    Excellent,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score <= 1.0 {
            ScoreBand::Critical
        } else if score <= 2.0 {
            ScoreBand::Low
        } else if score <= 3.0 {
            ScoreBand::Moderate
        } else if score <= 4.0 {
            ScoreBand::Good
        } else {
            ScoreBand::Excellent
        }
    }

    pub fn label_key(self) -> &'static str {
        match self {
            ScoreBand::Critical => "report.bands.critical",
            ScoreBand::Low => "report.bands.low",
            ScoreBand::Moderate => "report.bands.moderate",
            ScoreBand::Good => "report.bands.good",
            ScoreBand::Excellent => "report.bands.excellent",
        }
    }

    /// ANSI foreground colour for terminals.
    pub fn ansi_colour(self) -> &'static str {
        match self {
            ScoreBand::Critical => "\x1b[31m",
            ScoreBand::Low => "\x1b[38;5;208m",
            ScoreBand::Moderate => "\x1b[33m",
            ScoreBand::Good => "\x1b[38;5;154m",
            ScoreBand::Excellent => "\x1b[32m",
        }
    }
}

const ANSI_RESET: &str = "\x1b[0m";

impl Report {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Mean of the axis scores, rounded to one decimal. Zero without axes.
    pub fn overall_score(&self) -> f64 {
        if self.axes.is_empty() {
            return 0.0;
        }
        let mean = self.axes.iter().map(|axis| axis.score).sum::<f64>() / self.axes.len() as f64;
        (mean * 10.0).round() / 10.0
    }

    /// Plain text rendering, as written by [`Report::print_to`].
    pub fn render(&self, catalog: &Catalog) -> String {
        self.render_with(catalog, false)
    }

    /// Renders the report; with `colour` the score bands carry ANSI colours.
    pub fn render_with(&self, catalog: &Catalog, colour: bool) -> String {
        let mut out = Vec::new();

        out.push(catalog.t("report.auditLabel").to_uppercase());
        out.push(catalog.t("report.title"));
        out.push("=".repeat(RULE_WIDTH));
        out.push(format!(
            "{:.1} / 5.0    {}: {}",
            self.overall_score(),
            catalog.t("report.maturityLabel"),
            self.maturity_level
        ));
        out.push(String::new());
        out.push(format!("\"{}\"", self.executive_summary));

        out.push(String::new());
        out.push(section(&catalog.t("report.evaluationByAxis")));
        for axis in &self.axes {
            out.push(String::new());
            out.push(axis.title.clone());
            let band = ScoreBand::from_score(axis.score);
            let label = catalog.t(band.label_key());
            let (bar, label) = match colour {
                true => (
                    format!("{}{}{ANSI_RESET}", band.ansi_colour(), score_bar(axis.score)),
                    format!("{}{label}{ANSI_RESET}", band.ansi_colour()),
                ),
                false => (score_bar(axis.score), label),
            };
            out.push(format!(
                "{}: {:.1}/5 ({})",
                catalog.t("report.scoreLabel"),
                axis.score,
                label
            ));
            out.push(bar);
            if !axis.strengths.is_empty() {
                out.push(format!("  ✓ {}", catalog.t("report.strengthsTitle")));
                out.extend(axis.strengths.iter().map(|s| format!("    • {s}")));
            }
            if !axis.weaknesses.is_empty() {
                out.push(format!("  ! {}", catalog.t("report.weaknessesTitle")));
                out.extend(axis.weaknesses.iter().map(|w| format!("    • {w}")));
            }
        }

        out.push(String::new());
        out.push(section(&catalog.t("report.globalAnalysisTitle")));
        out.push(self.global_analysis.clone());

        out.push(String::new());
        out.push(section(&catalog.t("report.roadmapTitle")));
        out.push(catalog.t("report.actionsPrioritaires"));
        out.extend(
            self.roadmap
                .priority_actions
                .iter()
                .enumerate()
                .map(|(idx, action)| format!("  {}. {}", idx + 1, action)),
        );
        if !self.roadmap.conclusion.is_empty() {
            out.push(String::new());
            out.push(format!("\"{}\"", self.roadmap.conclusion));
        }

        out.push(String::new());
        out.push("-".repeat(RULE_WIDTH));
        out.push(catalog.t("report.generatedBy"));
        if let Some(date) = &self.generated_at {
            out.push(catalog.t_with("report.generatedAt", &[("date", date.as_str())]));
        }

        // API text may span several lines; each one gets the direction mark.
        let mark = catalog.direction().mark();
        out.join("\n")
            .lines()
            .map(|line| format!("{mark}{line}\n"))
            .collect()
    }

    /// Writes the rendered report to `path`, the terminal counterpart of printing.
    pub fn print_to(&self, path: &Path, catalog: &Catalog) -> Result<(), Error> {
        std::fs::write(path, self.render(catalog))?;
        info!(path = %path.display(), language = %catalog.language(), "Report written");
        Ok(())
    }
}

fn section(title: &str) -> String {
    format!("── {} ──", title.to_uppercase())
}

fn score_bar(score: f64) -> String {
    let ratio = (score / MAX_SCORE).clamp(0.0, 1.0);
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}
