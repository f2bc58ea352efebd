use std::io::{stdin, stdout, BufRead, StdinLock, Stdout, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use simple_audit::config::AppConfig;
use simple_audit::settings::Settings;
use simple_audit::{
    telemetry, AuditFramework, Catalog, CompanySize, Error, Field, HttpAuditApi, Language, Report,
    View, Wizard, AUDIT,
};

#[derive(Parser, Debug)]
#[command(
    name = "simple_audit",
    about = "Answer the AI maturity audit and receive your report",
    version
)]
struct Cli {
    /// Interface language (en, fr, ar)
    #[arg(long, global = true)]
    lang: Option<String>,
    /// Base URL of the report API
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Question dataset to use instead of the bundled one
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the interactive audit (default command)
    Run,
    /// List the questions of the dataset
    Questions,
    /// Render a report JSON saved from the API
    Render {
        path: PathBuf,
        /// Write the rendering to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

enum Flow {
    Landing,
    Quit,
}

struct Console {
    input: StdinLock<'static>,
    output: Stdout,
}

impl Console {
    fn new() -> Self {
        Self {
            input: stdin().lock(),
            output: stdout(),
        }
    }

    fn say(&mut self, catalog: &Catalog, text: &str) -> Result<(), Error> {
        let mark = catalog.direction().mark();
        for line in text.lines() {
            writeln!(self.output, "{mark}{line}")?;
        }
        Ok(())
    }

    fn blank(&mut self) -> Result<(), Error> {
        writeln!(self.output)?;
        Ok(())
    }

    /// `None` once stdin is closed.
    fn prompt(&mut self, catalog: &Catalog, text: &str) -> Result<Option<String>, Error> {
        write!(self.output, "{}{} > ", catalog.direction().mark(), text)?;
        self.output.flush()?;
        let mut buffer = String::new();
        if self.input.read_line(&mut buffer)? == 0 {
            return Ok(None);
        }
        Ok(Some(buffer.trim().to_string()))
    }
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
        config.api.validate()?;
    }
    if let Some(lang) = cli.lang {
        config.language = Some(lang.parse()?);
    }
    if let Some(path) = cli.dataset {
        config.dataset = Some(path);
    }
    telemetry::init(&config.telemetry)?;

    let loaded;
    let framework: &AuditFramework = match &config.dataset {
        Some(path) => {
            loaded = AuditFramework::load(path)?;
            &loaded
        }
        None => &*AUDIT,
    };

    let settings_dir = Settings::default_dir();
    let settings = settings_dir
        .as_deref()
        .map(Settings::load)
        .unwrap_or_default();
    let catalog = Catalog::new(config.resolve_language(&settings));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let api = HttpAuditApi::new(&config.api.base_url, config.api.timeout)?;
            let mut app = App {
                console: Console::new(),
                catalog,
                settings,
                settings_dir,
                api,
            };
            app.run(framework)
        }
        Command::Questions => list_questions(framework, &catalog),
        Command::Render { path, output } => render_saved(&path, output.as_deref(), &catalog),
    }
}

fn list_questions(framework: &AuditFramework, catalog: &Catalog) -> Result<(), Error> {
    let mut console = Console::new();
    let lang = catalog.language().code();
    for axis in &framework.axes {
        console.say(catalog, &format!("[{}] {}", axis.id, axis.title.localize(lang)))?;
        for question in &axis.questions {
            console.say(
                catalog,
                &format!("  {} {}", question.id, question.text.localize(lang)),
            )?;
            for option in &question.options {
                console.say(
                    catalog,
                    &format!("      {} => {}", option.value, option.label.localize(lang)),
                )?;
            }
        }
    }
    Ok(())
}

fn render_saved(path: &Path, output: Option<&Path>, catalog: &Catalog) -> Result<(), Error> {
    let report = Report::load(path)?;
    match output {
        Some(output) => report.print_to(output, catalog),
        None => {
            print!("{}", report.render(catalog));
            Ok(())
        }
    }
}

struct App {
    console: Console,
    catalog: Catalog,
    settings: Settings,
    settings_dir: Option<PathBuf>,
    api: HttpAuditApi,
}

impl App {
    fn run(&mut self, framework: &AuditFramework) -> Result<(), Error> {
        let mut wizard = Wizard::new(framework)?;
        info!(
            questions = wizard.total_questions(),
            language = %self.catalog.language(),
            "Audit wizard starting"
        );
        loop {
            self.landing()?;
            let Some(input) = self.console.prompt(&self.catalog, &self.catalog.t("prompt.landing"))?
            else {
                return Ok(());
            };
            match input.as_str() {
                "q" => return Ok(()),
                "l" => {
                    self.change_language()?;
                    continue;
                }
                _ => {}
            }

            wizard.reset();
            match self.audit(&mut wizard)? {
                Flow::Landing => continue,
                Flow::Quit => return Ok(()),
            }
        }
    }

    fn landing(&mut self) -> Result<(), Error> {
        let t = |key: &str| self.catalog.t(key);
        let text = format!(
            "{}\n{}\n\n* {}\n  {}\n* {}\n  {}\n* {}\n  {}\n\n{} →\n{}",
            t("titles.main"),
            t("subtitle"),
            t("features.axisTitle"),
            t("features.axisDesc"),
            t("features.recommendationsTitle"),
            t("features.recommendationsDesc"),
            t("features.roadmapTitle"),
            t("features.roadmapDesc"),
            t("buttons.start"),
            t("cta.subtitle"),
        );
        self.console.blank()?;
        self.console.say(&self.catalog, &text)
    }

    fn audit(&mut self, wizard: &mut Wizard<'_>) -> Result<Flow, Error> {
        loop {
            let step = match wizard.view() {
                View::Questions => self.question_step(wizard)?,
                View::PersonalForm => self.personal_step(wizard)?,
                View::Report => self.report_step(wizard)?,
            };
            if let Some(flow) = step {
                return Ok(flow);
            }
        }
    }

    fn question_step(&mut self, wizard: &mut Wizard<'_>) -> Result<Option<Flow>, Error> {
        let lang = self.catalog.language().code();
        let axis = wizard.current_axis();
        let question = wizard.current_question();
        let selected = wizard.selected();
        let current = wizard.question_number().to_string();
        let total = wizard.total_questions().to_string();

        let mut text = format!(
            "[{}] {}    {}%\n{}\n\n{}\n",
            axis.title.localize(lang),
            self.catalog.t_with(
                "question.progress",
                &[("current", current.as_str()), ("total", total.as_str())],
            ),
            wizard.progress_percentage(),
            progress_bar(wizard.progress_percentage()),
            question.text.localize(lang),
        );
        for (idx, option) in question.options.iter().enumerate() {
            let marker = if selected == Some(option.value) { "●" } else { "○" };
            text.push_str(&format!(
                "  {} {}. {}\n",
                marker,
                idx + 1,
                option.label.localize(lang)
            ));
        }
        let next_label = if wizard.is_last_question() {
            self.catalog.t("buttons.finish")
        } else {
            format!("{} →", self.catalog.t("buttons.next"))
        };
        text.push_str(&format!("\nn: {next_label}"));
        if wizard.can_go_previous() {
            text.push_str(&format!("    p: ← {}", self.catalog.t("buttons.previous")));
        }

        self.console.blank()?;
        self.console.say(&self.catalog, &text)?;
        let count = question.options.len().to_string();
        let prompt = self
            .catalog
            .t_with("prompt.answer", &[("count", count.as_str())]);
        let Some(input) = self.console.prompt(&self.catalog, &prompt)? else {
            return Ok(Some(Flow::Quit));
        };

        match input.as_str() {
            "n" => {
                if wizard.next().is_err() {
                    self.console
                        .say(&self.catalog, &self.catalog.t("prompt.unanswered"))?;
                }
            }
            "p" => wizard.previous(),
            "b" => return Ok(Some(Flow::Landing)),
            "l" => self.change_language()?,
            "q" => return Ok(Some(Flow::Quit)),
            choice => {
                let option = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| question.options.get(idx));
                match option {
                    Some(option) => wizard.answer(option.value)?,
                    None => self
                        .console
                        .say(&self.catalog, &self.catalog.t("prompt.invalidChoice"))?,
                }
            }
        }
        Ok(None)
    }

    fn personal_step(&mut self, wizard: &mut Wizard<'_>) -> Result<Option<Flow>, Error> {
        let mut text = format!(
            "{}\n{}\n\n",
            self.catalog.t("personal.title"),
            self.catalog.t("personal.subtitle")
        );
        for (idx, field) in Field::ALL.iter().enumerate() {
            let value = match (field, wizard.personal().size) {
                (Field::Size, Some(size)) => self.catalog.t(&size.label_key()),
                (Field::Size, None) => self.catalog.t("personal.sizePlaceholder"),
                _ => wizard.personal().value(*field).to_string(),
            };
            text.push_str(&format!(
                "  {}. {}: {}\n",
                idx + 1,
                self.catalog.t(&field.label_key()),
                value
            ));
        }
        text.push_str(&format!(
            "\ns: {}    p: {}",
            self.catalog.t("buttons.submit"),
            self.catalog.t("buttons.back")
        ));
        if let Some(error) = wizard.error() {
            text.push_str(&format!("\n\n! {error}"));
        }

        self.console.blank()?;
        self.console.say(&self.catalog, &text)?;
        let Some(input) = self
            .console
            .prompt(&self.catalog, &self.catalog.t("prompt.personalMenu"))?
        else {
            return Ok(Some(Flow::Quit));
        };

        match input.as_str() {
            "s" => {
                if !wizard.can_submit() {
                    self.console
                        .say(&self.catalog, &self.catalog.t("personal.invalid"))?;
                    return Ok(None);
                }
                self.console.say(
                    &self.catalog,
                    &format!(
                        "{}\n{}",
                        self.catalog.t("buttons.generating"),
                        self.catalog.t("report.generating")
                    ),
                )?;
                wizard.submit(&self.api, self.catalog.language());
            }
            "p" => wizard.previous(),
            "b" => return Ok(Some(Flow::Landing)),
            "l" => self.change_language()?,
            "q" => return Ok(Some(Flow::Quit)),
            choice => {
                let field = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| Field::ALL.get(idx).copied());
                match field {
                    Some(field) => self.edit_field(wizard, field)?,
                    None => self
                        .console
                        .say(&self.catalog, &self.catalog.t("prompt.invalidChoice"))?,
                }
            }
        }
        Ok(None)
    }

    fn edit_field(&mut self, wizard: &mut Wizard<'_>, field: Field) -> Result<(), Error> {
        if field == Field::Size {
            let options = CompanySize::ALL
                .iter()
                .enumerate()
                .map(|(idx, size)| format!("  {}. {}", idx + 1, self.catalog.t(&size.label_key())))
                .collect::<Vec<_>>()
                .join("\n");
            self.console.say(&self.catalog, &options)?;
        }
        let label = self.catalog.t(&field.label_key());
        let prompt = self.catalog.t_with(
            "prompt.field",
            &[
                ("label", label.as_str()),
                ("value", wizard.personal().value(field)),
            ],
        );
        let Some(value) = self.console.prompt(&self.catalog, &prompt)? else {
            return Ok(());
        };
        if wizard.personal_mut().set(field, &value).is_err() {
            self.console
                .say(&self.catalog, &self.catalog.t("prompt.invalidChoice"))?;
        }
        Ok(())
    }

    fn report_step(&mut self, wizard: &mut Wizard<'_>) -> Result<Option<Flow>, Error> {
        let Some(report) = wizard.report().cloned() else {
            return Ok(None);
        };
        self.console.blank()?;
        print!("{}", report.render_with(&self.catalog, true));
        self.console.blank()?;
        let Some(input) = self
            .console
            .prompt(&self.catalog, &self.catalog.t("prompt.reportMenu"))?
        else {
            return Ok(Some(Flow::Quit));
        };

        match input.as_str() {
            "w" => {
                let Some(path) = self
                    .console
                    .prompt(&self.catalog, &self.catalog.t("prompt.path"))?
                else {
                    return Ok(Some(Flow::Quit));
                };
                if path.is_empty() {
                    return Ok(None);
                }
                match report.print_to(Path::new(&path), &self.catalog) {
                    Ok(()) => self.console.say(
                        &self.catalog,
                        &self.catalog.t_with("report.saved", &[("path", path.as_str())]),
                    )?,
                    Err(e) => self.console.say(&self.catalog, &format!("! {e}"))?,
                }
            }
            "b" => wizard.reset(),
            "l" => self.change_language()?,
            "q" => return Ok(Some(Flow::Quit)),
            _ => {}
        }
        Ok(None)
    }

    fn change_language(&mut self) -> Result<(), Error> {
        let choices = Language::ALL
            .iter()
            .map(|language| format!("{} = {}", language.code(), self.catalog.t(&language.label_key())))
            .collect::<Vec<_>>()
            .join(", ");
        self.console.say(&self.catalog, &choices)?;
        let Some(input) = self
            .console
            .prompt(&self.catalog, &self.catalog.t("prompt.language"))?
        else {
            return Ok(());
        };
        match input.parse::<Language>() {
            Ok(language) => {
                self.catalog.set_language(language);
                self.settings
                    .remember_language(language, self.settings_dir.as_deref());
            }
            Err(e) => self.console.say(&self.catalog, &format!("! {e}"))?,
        }
        Ok(())
    }
}

fn progress_bar(percentage: u8) -> String {
    let filled = usize::from(percentage.min(100)) * 40 / 100;
    format!("{}{}", "━".repeat(filled), "─".repeat(40 - filled))
}
