use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::api_client::HttpBackend;
use crate::clipboard::Osc52Clipboard;
use crate::config::Config;
use crate::controller::view::FlowState;
use crate::controller::UploadAndGenerateController;
use crate::models::upload::UploadedFile;
use crate::terminal::run_interactive;

#[derive(Debug, Parser)]
#[command(
    name = "coverdesk",
    version,
    about = "Upload a resume, paste a job description, get a cover letter"
)]
pub struct Cli {
    /// Backend base URL (overrides BACKEND_URL)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract and print the text of a resume
    Extract {
        #[arg(long)]
        resume: PathBuf,
    },
    /// Extract a resume and generate a cover letter for a job description
    Generate(GenerateArgs),
    /// Drive the page interactively from the terminal (default)
    Interactive,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[arg(long)]
    pub resume: PathBuf,

    #[command(flatten)]
    pub job: JobSource,

    /// Print the letter as HTML paragraphs
    #[arg(long)]
    pub html: bool,

    /// Also copy the letter to the clipboard
    #[arg(long)]
    pub copy: bool,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct JobSource {
    /// File containing the job description
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Job description text
    #[arg(long)]
    pub job_text: Option<String>,
}

impl JobSource {
    async fn read(&self) -> Result<String> {
        match (&self.job, &self.job_text) {
            (Some(path), _) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read job description: {}", path.display())),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => bail!("A job description is required"),
        }
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let config = config.with_backend_url(cli.backend_url);
    let backend = HttpBackend::from_config(&config).context("Failed to create HTTP client")?;
    let mut controller = UploadAndGenerateController::new(config.max_upload_bytes);

    info!("Backend: {}", backend.base_url());

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Extract { resume } => {
            upload(&mut controller, &backend, &resume).await?;
            println!("{}", controller.extracted_resume_text());
        }
        Command::Generate(args) => {
            let job_description = args.job.read().await?;
            upload(&mut controller, &backend, &args.resume).await?;

            controller.set_job_description(job_description);
            if controller.generate_cover_letter(&backend).await != FlowState::Succeeded {
                bail!("{}", controller.view().generate_error);
            }

            if let Some(letter) = &controller.view().result {
                if args.html {
                    println!("{}", letter.to_html());
                } else {
                    println!("{}", letter.plain_text());
                }
            }

            if args.copy && controller.copy_to_clipboard(&Osc52Clipboard).await {
                eprintln!("{}", controller.view().copy_button_label());
            }
        }
        Command::Interactive => {
            run_interactive(controller, Arc::new(backend), Arc::new(Osc52Clipboard)).await?;
        }
    }

    Ok(())
}

async fn upload(
    controller: &mut UploadAndGenerateController,
    backend: &HttpBackend,
    path: &std::path::Path,
) -> Result<()> {
    let file = UploadedFile::from_path(path).await?;
    if controller.handle_resume_upload(backend, file).await != FlowState::Succeeded {
        bail!("{}", controller.view().upload_error);
    }
    Ok(())
}
