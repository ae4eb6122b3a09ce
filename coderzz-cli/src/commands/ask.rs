//! One-shot question: pick a template, stream the answer, exit.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use coderzz_core::input::read_document;
use coderzz_core::{QuerySource, QuickAction};

use super::{GenerationOverrides, StreamPrinter, bootstrap, resolve_action};
use crate::config::CoderzzConfig;

#[derive(Debug, Args)]
pub struct AskArgs {
    /// The question (joined with spaces)
    pub question: Vec<String>,

    /// Prefix the question with "Generate <language> code for: "
    #[arg(short, long)]
    pub language: Option<QuickAction>,

    /// Read the question from a text document
    #[arg(long, conflicts_with = "image")]
    pub file: Option<PathBuf>,

    /// Read the question from an image via OCR
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Use this template (index or label) instead of letting the policy choose
    #[arg(short, long)]
    pub action: Option<String>,

    #[command(flatten)]
    pub generation: GenerationOverrides,
}

pub async fn run(args: AskArgs) -> Result<()> {
    let (config, manager, assistant) = bootstrap(&args.generation)?;
    let (question, source) = gather_question(&args, &config).await?;

    let action = args
        .action
        .as_deref()
        .map(|reference| resolve_action(manager.actions(), reference))
        .transpose()?;

    let id = manager.create_session().await?;
    let session = manager.get(&id).await?;
    let mut session = session.lock().await;

    let mut printer = StreamPrinter::new(std::io::stdout());
    let generation = match action {
        Some(action) => {
            assistant
                .generate_with_action(&mut session, &question, source, action, |text| {
                    printer.show(text)
                })
                .await?
        }
        None => {
            assistant
                .generate(&mut session, &question, source, |text| printer.show(text))
                .await?
        }
    };
    printer.finish()?;

    tracing::debug!(
        action = generation.prompt.action,
        label = %generation.prompt.label,
        chunks = generation.chunks,
        "Answered"
    );
    Ok(())
}

/// Combine the positional question with file/image input and a language prefix.
async fn gather_question(args: &AskArgs, config: &CoderzzConfig) -> Result<(String, QuerySource)> {
    let typed = args.question.join(" ");

    let (body, source) = if let Some(path) = &args.file {
        (read_document(path).await?, QuerySource::Document)
    } else if let Some(path) = &args.image {
        let text = config.ocr.engine().extract_from_path(path).await?;
        (text, QuerySource::Image)
    } else {
        (typed.clone(), QuerySource::Typed)
    };

    // Typed words still count when combined with a document or image.
    let body = if source != QuerySource::Typed && !typed.trim().is_empty() {
        format!("{} {}", typed.trim(), body.trim())
    } else {
        body.trim().to_string()
    };

    if body.is_empty() {
        bail!("No question given; pass it as arguments, --file or --image");
    }

    let question = match args.language {
        Some(language) => format!("{}{}", language.prefix(), body),
        None => body,
    };
    Ok((question, source))
}
