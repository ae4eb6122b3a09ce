//! Interactive chat loop.
//!
//! Every answer is followed by "Was this code helpful?". A "no" lists the
//! templates so the user can pick one and get the question answered again;
//! the value table learns from each verdict for the rest of the session.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use coderzz_core::feedback::ASK_CODE_TYPE;
use coderzz_core::input::read_document;
use coderzz_core::session::RECENT_HISTORY_LEN;
use coderzz_core::{
    Assistant, Feedback, FeedbackOutcome, Generation, QuerySource, QuickAction, Session,
    SessionError, TesseractOcr,
};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use super::{GenerationOverrides, StreamPrinter, bootstrap, resolve_action};

const HELP: &str = "\
Type a question and press enter. Commands:
  /python /javascript /java /cpp [question]  ask for code in that language
  /file <path>     use a text document as the question
  /image <path>    use the text in an image (OCR) as the question
  /history         show recent messages
  /values          show what the assistant has learned
  /reset           clear history and learned values
  /help            show this help
  /quit            leave";

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[command(flatten)]
    pub generation: GenerationOverrides,
}

pub async fn run(args: ChatArgs) -> Result<()> {
    let (config, manager, assistant) = bootstrap(&args.generation)?;
    let id = manager.create_session().await?;
    let shared = manager.get(&id).await?;
    let mut session = shared.lock().await;

    println!(
        "Coderzz.AI ({} / {}). Type /help for commands.",
        assistant.provider_name(),
        assistant.settings().model
    );

    let input = BufReader::new(tokio::io::stdin());
    let mut repl = Repl::new(input, std::io::stdout(), &assistant, config.ocr.engine());
    repl.run(&mut session).await
}

/// What the user typed at the main prompt
#[derive(Debug, PartialEq)]
enum Command {
    Ask(String),
    Quick(QuickAction, Option<String>),
    File(String),
    Image(String),
    History,
    Values,
    Reset,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Ask(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };

        match name.to_lowercase().as_str() {
            "history" => Command::History,
            "values" => Command::Values,
            "reset" => Command::Reset,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "file" => arg.map_or(Command::Unknown(line.to_string()), Command::File),
            "image" => arg.map_or(Command::Unknown(line.to_string()), Command::Image),
            other => match other.parse::<QuickAction>() {
                Ok(language) => Command::Quick(language, arg),
                Err(_) => Command::Unknown(line.to_string()),
            },
        }
    }
}

pub(crate) struct Repl<'a, R, W> {
    lines: Lines<R>,
    out: W,
    assistant: &'a Assistant,
    ocr: TesseractOcr,
}

impl<'a, R, W> Repl<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    pub fn new(input: R, out: W, assistant: &'a Assistant, ocr: TesseractOcr) -> Self {
        Self {
            lines: input.lines(),
            out,
            assistant,
            ocr,
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }

    pub async fn run(&mut self, session: &mut Session) -> Result<()> {
        loop {
            let prompt = if session.input_buffer().is_empty() {
                "> ".to_string()
            } else {
                format!("> {}", session.input_buffer())
            };
            let Some(line) = self.read_line(&prompt).await? else {
                break;
            };

            match Command::parse(&line) {
                Command::Empty => {}
                Command::Ask(text) => {
                    // A staged quick-action prefix is completed by the next line.
                    let question = format!("{}{}", session.input_buffer(), text);
                    self.ask(session, &question, QuerySource::Typed).await?;
                }
                Command::Quick(language, Some(text)) => {
                    let question = format!("{}{}", language.prefix(), text);
                    self.ask(session, &question, QuerySource::Typed).await?;
                }
                Command::Quick(language, None) => {
                    session.stage_input(language.prefix(), QuerySource::Typed)
                }
                Command::File(path) => match read_document(Path::new(&path)).await {
                    Ok(text) => self.ask(session, &text, QuerySource::Document).await?,
                    Err(e) => writeln!(self.out, "Error: {e}")?,
                },
                Command::Image(path) => match self.ocr.extract_from_path(Path::new(&path)).await {
                    Ok(text) => {
                        writeln!(self.out, "Recognized: {}", text.trim())?;
                        self.ask(session, &text, QuerySource::Image).await?;
                    }
                    Err(e) => writeln!(self.out, "Error: {e}")?,
                },
                Command::History => self.show_history(session)?,
                Command::Values => self.show_values(session)?,
                Command::Reset => {
                    session.reset();
                    writeln!(self.out, "Session reset.")?;
                }
                Command::Help => writeln!(self.out, "{HELP}")?,
                Command::Quit => break,
                Command::Unknown(line) => {
                    writeln!(self.out, "Unknown command '{line}'. Type /help for commands.")?
                }
            }
        }

        writeln!(self.out, "Goodbye!")?;
        Ok(())
    }

    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        Ok(self.lines.next_line().await?)
    }

    /// Answer a question, then keep asking for feedback until the user is
    /// satisfied, skips, or leaves.
    async fn ask(&mut self, session: &mut Session, question: &str, source: QuerySource) -> Result<()> {
        let mut printer = StreamPrinter::new(&mut self.out);
        let result = self
            .assistant
            .generate(session, question, source, |text| printer.show(text))
            .await;
        printer.finish()?;

        let mut generation = match result {
            Ok(generation) => generation,
            Err(e) => return self.report(e),
        };

        loop {
            let Some(choice) = self.collect_feedback(session, &generation).await? else {
                return Ok(());
            };

            let mut printer = StreamPrinter::new(&mut self.out);
            let result = self
                .assistant
                .regenerate(session, choice, |text| printer.show(text))
                .await;
            printer.finish()?;

            generation = match result {
                Ok(generation) => generation,
                Err(e) => return self.report(e),
            };
        }
    }

    /// Ask "Was this code helpful?" and apply the answer.
    ///
    /// Returns the template to regenerate with after a "no", if one was picked.
    async fn collect_feedback(
        &mut self,
        session: &mut Session,
        generation: &Generation,
    ) -> Result<Option<usize>> {
        let feedback = loop {
            let Some(line) = self
                .read_line(&format!(
                    "Was this code helpful? [yes/no/skip] ({}) ",
                    generation.prompt.label
                ))
                .await?
            else {
                // Leaving mid-feedback closes the episode unrated.
                self.assistant.feedback(session, None)?;
                return Ok(None);
            };
            match Feedback::parse(&line) {
                Ok(feedback) => break feedback,
                Err(e) => writeln!(self.out, "{e}")?,
            }
        };

        let outcome = self.assistant.feedback(session, feedback)?;
        let FeedbackOutcome::Updated {
            feedback, message, ..
        } = outcome
        else {
            return Ok(None);
        };

        writeln!(self.out, "{message}")?;
        if feedback == Feedback::Helpful {
            return Ok(None);
        }
        self.choose_template(session).await
    }

    async fn choose_template(&mut self, session: &Session) -> Result<Option<usize>> {
        let actions = session.policy().actions();
        for action in actions.iter() {
            writeln!(self.out, "  {}. {}", action.index() + 1, action.label())?;
        }

        loop {
            let Some(line) = self
                .read_line(&format!("{ASK_CODE_TYPE} [1-{}, enter to skip] ", actions.len()))
                .await?
            else {
                return Ok(None);
            };
            let line = line.trim();
            if line.is_empty() {
                return Ok(None);
            }

            // Choices are shown 1-based.
            let reference = match line.parse::<usize>() {
                Ok(n) if n >= 1 => (n - 1).to_string(),
                _ => line.to_string(),
            };
            match resolve_action(actions, &reference) {
                Ok(index) => return Ok(Some(index)),
                Err(e) => writeln!(self.out, "{e}")?,
            }
        }
    }

    fn report(&mut self, error: SessionError) -> Result<()> {
        tracing::debug!(error = %error, "Generation failed");
        writeln!(self.out, "Error: {error}")?;
        Ok(())
    }

    fn show_history(&mut self, session: &Session) -> Result<()> {
        let entries = session.recent_history(RECENT_HISTORY_LEN);
        if entries.is_empty() {
            writeln!(self.out, "No messages yet.")?;
        }
        for entry in entries {
            writeln!(self.out, "{entry}")?;
        }
        Ok(())
    }

    fn show_values(&mut self, session: &Session) -> Result<()> {
        let policy = session.policy();
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("#").fg(Color::Cyan),
                Cell::new("Code type").fg(Color::Cyan),
                Cell::new("Value").fg(Color::Cyan),
            ]);
        for action in policy.actions().iter() {
            let value = policy.values().get(action.index()).unwrap_or_default();
            table.add_row(vec![
                Cell::new(action.index() + 1),
                Cell::new(action.label()),
                Cell::new(format!("{value:.4}")),
            ]);
        }
        writeln!(self.out, "{table}")?;
        writeln!(self.out, "epsilon = {}", policy.config().epsilon)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderzz_core::{PolicyConfig, TemplatePolicy};
    use coderzz_models::providers::SimulatedProvider;
    use coderzz_core::GenerationSettings;
    use std::sync::Arc;

    fn greedy_session() -> Session {
        let config = PolicyConfig {
            epsilon: 0.0,
            ..Default::default()
        };
        Session::new("chat", TemplatePolicy::with_seed(config, 3).unwrap())
    }

    fn assistant() -> Assistant {
        Assistant::new(
            Arc::new(SimulatedProvider::new()),
            GenerationSettings::default(),
        )
    }

    async fn transcript(script: &str, session: &mut Session) -> String {
        let assistant = assistant();
        let mut repl = Repl::new(
            script.as_bytes(),
            Vec::new(),
            &assistant,
            TesseractOcr::default(),
        );
        repl.run(session).await.unwrap();
        String::from_utf8(repl.into_output()).unwrap()
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("  "), Command::Empty);
        assert_eq!(
            Command::parse("sort a list"),
            Command::Ask("sort a list".to_string())
        );
        assert_eq!(
            Command::parse("/python"),
            Command::Quick(QuickAction::Python, None)
        );
        assert_eq!(
            Command::parse("/JS fizzbuzz"),
            Command::Quick(QuickAction::JavaScript, Some("fizzbuzz".to_string()))
        );
        assert_eq!(
            Command::parse("/file notes.txt"),
            Command::File("notes.txt".to_string())
        );
        assert_eq!(Command::parse("/file"), Command::Unknown("/file".to_string()));
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(
            Command::parse("/cobol"),
            Command::Unknown("/cobol".to_string())
        );
    }

    #[tokio::test]
    async fn test_helpful_feedback_thanks_and_learns() {
        let mut session = greedy_session();
        let out = transcript("sort a list\nYes\n", &mut session).await;

        assert!(out.contains("# Generated code for: "));
        assert!(out.contains("sort a list"));
        assert!(out.contains("Thank you for your feedback!"));
        assert!(out.trim_end().ends_with("Goodbye!"));
        assert!((session.policy().values().as_slice()[0] - 0.1).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_not_helpful_offers_choices_and_regenerates() {
        let mut session = greedy_session();
        let out = transcript("parse json\nno\n4\nyes\n", &mut session).await;

        assert!(out.contains("What type of code do you need?"));
        assert!(out.contains("4. Optimized code"));
        assert!(out.contains("Write optimized"));

        let values = session.policy().values().as_slice();
        assert!(values[0] < 0.0);
        assert!(values[3] > 0.0);
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn test_unrecognized_feedback_asks_again() {
        let mut session = greedy_session();
        let out = transcript("hello\nmaybe\nskip\n", &mut session).await;

        assert!(out.contains("unrecognized feedback 'maybe'"));
        assert_eq!(session.policy().values().as_slice(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_quick_action_prefix_completes_next_line() {
        let mut session = greedy_session();
        let out = transcript("/python\nfizzbuzz\n\n/history\n", &mut session).await;

        assert!(out.contains("You ("));
        assert!(out.contains("Generate Python code for: fizzbuzz"));
        assert_eq!(
            session.last_question(),
            Some("Generate Python code for: fizzbuzz")
        );
    }

    #[tokio::test]
    async fn test_values_and_reset() {
        let mut session = greedy_session();
        let out = transcript("hi\ny\n/values\n/reset\n/history\n", &mut session).await;

        assert!(out.contains("0.1000"));
        assert!(out.contains("Session reset."));
        assert!(out.contains("No messages yet."));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_reports_error_and_continues() {
        let mut session = greedy_session();
        let out = transcript("/file /nonexistent/task.txt\n/quit\n", &mut session).await;
        assert!(out.contains("Error:"));
        assert!(out.contains("Goodbye!"));
    }
}
