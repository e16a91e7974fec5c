//! Line-oriented stand-in for the web page: commands on stdin become page
//! events, and view changes are printed as they arrive.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::debug;

use crate::api_client::BackendApi;
use crate::clipboard::Clipboard;
use crate::controller::view::PageView;
use crate::controller::UploadAndGenerateController;
use crate::models::upload::UploadedFile;
use crate::page::{spawn_page, PageEvent, PageHandle};

const HELP: &str = "\
commands:
  upload <path>   select a resume (PDF or Word)
  job <text>      set the job description
  job             enter a multi-line job description, end with a line containing only '.'
  generate        generate the cover letter
  copy            copy the cover letter to the clipboard
  show            print the page
  help            print this help
  quit            leave";

#[derive(Debug, PartialEq)]
enum Command {
    Upload(PathBuf),
    Job(Option<String>),
    Generate,
    Copy,
    Show,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "upload" if rest.is_empty() => return Err("usage: upload <path>".to_string()),
        "upload" => Command::Upload(PathBuf::from(rest)),
        "job" if rest.is_empty() => Command::Job(None),
        "job" => Command::Job(Some(rest.to_string())),
        "generate" => Command::Generate,
        "copy" => Command::Copy,
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

pub async fn run_interactive(
    controller: UploadAndGenerateController,
    api: Arc<dyn BackendApi>,
    clipboard: Arc<dyn Clipboard>,
) -> Result<()> {
    let PageHandle { events, view, task } = spawn_page(controller, api, clipboard);
    let printer = tokio::spawn(print_updates(view.clone()));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        let event = match command {
            Command::Upload(path) => match UploadedFile::from_path(&path).await {
                Ok(file) => PageEvent::ResumeSelected(file),
                Err(e) => {
                    eprintln!("{e:#}");
                    continue;
                }
            },
            Command::Job(Some(text)) => PageEvent::JobDescriptionInput(text),
            Command::Job(None) => {
                let mut text = String::new();
                while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
                    if line.trim() == "." {
                        break;
                    }
                    text.push_str(&line);
                    text.push('\n');
                }
                PageEvent::JobDescriptionInput(text)
            }
            Command::Generate => PageEvent::GenerateClicked,
            Command::Copy => PageEvent::CopyClicked,
            Command::Show => {
                println!("{}", view.borrow().summary());
                continue;
            }
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
        };

        if events.send(event).await.is_err() {
            debug!("Page loop ended early");
            break;
        }
    }

    drop(events);
    task.await.context("Page task panicked")?;
    printer.abort();
    Ok(())
}

/// Prints the page whenever its text rendering changes.
async fn print_updates(mut view: watch::Receiver<PageView>) {
    let mut last = view.borrow().summary();
    while view.changed().await.is_ok() {
        let current = view.borrow_and_update().summary();
        if current != last {
            println!("{current}");
            last = current;
        }
    }
}
