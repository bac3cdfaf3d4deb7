//! Interactive editing session
//!
//! Reads edit commands from stdin and hands every change to the autosave
//! scheduler. Ending the session (quit, EOF or Ctrl+C) flushes whatever is
//! still pending before the process exits.

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::{Context, Result};
use autosave::{Autosaver, SaveStatus};
use desyn_core::{Project, ProjectError, Stroke};
use desyn_store::{Document, DocumentSaver};
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

/// How long to wait for the last save when the session ends
const FINAL_SAVE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
enum EditCommand {
    /// Append an empty frame and select it
    Frame,
    Select(usize),
    Stroke(Vec<(f32, f32)>),
    /// Remove a frame
    Drop(usize),
    Fps(u32),
    Save,
    Status,
    Help,
    Quit,
}

fn parse_point(token: &str) -> Result<(f32, f32), String> {
    let (x, y) = token
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", token))?;
    let x = x.trim().parse().map_err(|_| format!("bad x coordinate '{}'", x))?;
    let y = y.trim().parse().map_err(|_| format!("bad y coordinate '{}'", y))?;
    Ok((x, y))
}

fn parse_index(arg: Option<&str>, what: &str) -> Result<usize, String> {
    arg.ok_or_else(|| format!("{} needs a frame number", what))?
        .parse()
        .map_err(|_| format!("{} needs a frame number", what))
}

/// Parse one input line; blank lines yield `None`
fn parse_command(line: &str) -> Result<Option<EditCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };

    let command = match word {
        "frame" => EditCommand::Frame,
        "select" => EditCommand::Select(parse_index(parts.next(), "select")?),
        "drop" => EditCommand::Drop(parse_index(parts.next(), "drop")?),
        "stroke" => {
            let points = parts.map(parse_point).collect::<Result<Vec<_>, _>>()?;
            if points.len() < 2 {
                return Err("a stroke needs at least two points".to_string());
            }
            EditCommand::Stroke(points)
        }
        "fps" => {
            let fps = parts
                .next()
                .and_then(|arg| arg.parse().ok())
                .ok_or("fps needs a number")?;
            EditCommand::Fps(fps)
        }
        "save" => EditCommand::Save,
        "status" => EditCommand::Status,
        "help" | "?" => EditCommand::Help,
        "quit" | "exit" | "q" => EditCommand::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };

    Ok(Some(command))
}

/// Project being edited plus the selected frame
struct Session {
    project: Project,
    current: usize,
}

impl Session {
    fn new(project: Project) -> Self {
        let current = project.frame_count().saturating_sub(1);
        Self { project, current }
    }

    /// Apply an editing command, returning whether the project changed
    fn apply(&mut self, command: &EditCommand) -> Result<bool, ProjectError> {
        match command {
            EditCommand::Frame => {
                self.current = self.project.add_frame();
                Ok(true)
            }
            EditCommand::Select(index) => {
                let len = self.project.frame_count();
                if *index >= len {
                    return Err(ProjectError::FrameOutOfRange { index: *index, len });
                }
                self.current = *index;
                Ok(false)
            }
            EditCommand::Stroke(points) => {
                self.project
                    .push_stroke(self.current, Stroke::new(points.clone()))?;
                Ok(true)
            }
            EditCommand::Drop(index) => {
                self.project.remove_frame(*index)?;
                if self.current >= self.project.frame_count() || self.current > *index {
                    self.current = self.current.saturating_sub(1);
                }
                Ok(true)
            }
            EditCommand::Fps(fps) => {
                self.project.set_fps(*fps)?;
                Ok(true)
            }
            EditCommand::Save | EditCommand::Status | EditCommand::Help | EditCommand::Quit => {
                Ok(false)
            }
        }
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  frame                  add a frame and select it");
    println!("  select N               select frame N");
    println!("  stroke x,y x,y ...     draw a stroke on the selected frame");
    println!("  drop N                 remove frame N");
    println!("  fps N                  set playback rate");
    println!("  save                   save now");
    println!("  status                 show autosave state");
    println!("  quit                   save and exit");
}

fn print_status(session: &Session, status: &SaveStatus) {
    println!(
        "{} frame {}/{}, {} strokes, {} fps",
        session.project.name.bold(),
        session.current,
        session.project.frame_count(),
        session.project.stroke_count(),
        session.project.fps
    );
    println!("  Autosave: {:?}", status.phase);
    println!(
        "  Saves:    {} ok, {} failed",
        status.saves_completed, status.saves_failed
    );
    if let Some(at) = status.last_saved_at {
        println!("  Last:     {}", util::format_elapsed(at.elapsed()).dimmed());
    }
    if let Some(err) = &status.last_error {
        println!("  Error:    {}", err.red());
    }
}

/// Print save indicators for whatever changed since `seen`
fn report_saves(seen: &mut SaveStatus, current: SaveStatus) {
    if current.saves_completed > seen.saves_completed {
        println!("{}", "✓ saved".green());
    }
    if current.saves_failed > seen.saves_failed {
        let reason = current.last_error.as_deref().unwrap_or("unknown error");
        println!("{} {}", "✗ autosave failed:".red(), reason);
    }
    *seen = current;
}

pub async fn run(config: &SystemConfig, reference: &str) -> Result<()> {
    let store = Arc::new(util::open_store(&config.data_dir()?)?);
    let id = util::resolve_document_ref(reference, &store)?;

    let doc: Document<Project> = store
        .get(&id)
        .context("Failed to read project document")?
        .with_context(|| format!("Document disappeared: {}", id))?;

    let autosaver: Autosaver<Project> = Autosaver::new(
        DocumentSaver::new(Arc::clone(&store), id),
        config.autosave.clone(),
    )
    .context("Failed to start autosave")?;
    let mut status_rx = autosaver.subscribe();
    let mut seen = status_rx.borrow().clone();

    let mut session = Session::new(doc.value);
    info!("Editing session opened for {} (rev {})", id, doc.meta.revision);

    println!(
        "Editing {} {} (autosave after {:?} idle)",
        session.project.name.bold(),
        format!("rev {}", doc.meta.revision).cyan(),
        autosaver.config().interval()
    );
    println!("{}", "Type 'help' for commands, 'quit' to exit".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };

                let command = match parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{} {}", "?".yellow(), e);
                        continue;
                    }
                };

                match command {
                    EditCommand::Quit => break,
                    EditCommand::Help => print_help(),
                    EditCommand::Status => print_status(&session, &autosaver.status()),
                    EditCommand::Save => {
                        if let Err(e) = autosaver.flush().await {
                            println!("{} {}", "✗ save failed:".red(), e);
                        }
                    }
                    command => match session.apply(&command) {
                        Ok(true) => autosaver.update(session.project.clone()),
                        Ok(false) => {}
                        Err(e) => println!("{} {}", "✗".red(), e),
                    },
                }
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status_rx.borrow_and_update().clone();
                report_saves(&mut seen, current);
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    finish_session(autosaver, status_rx).await
}

/// Close the scheduler and wait for the last save to land
async fn finish_session(
    autosaver: Autosaver<Project>,
    mut status_rx: watch::Receiver<SaveStatus>,
) -> Result<()> {
    let final_save = autosaver.close();

    let wait = async {
        if let Some(handle) = final_save {
            println!("{}", "Saving...".dimmed());
            match handle.await {
                Ok(Ok(())) => println!("{}", "✓ saved".green()),
                Ok(Err(e)) => println!("{} {}", "✗ final save failed:".red(), e),
                Err(e) => println!("{} {}", "✗ final save aborted:".red(), e),
            }
        } else {
            // A save may still be in flight with the newest value queued behind it.
            // The sender goes away once the last save task is done.
            let _ = status_rx.wait_for(|status| !status.is_saving()).await;
        }
    };

    if tokio::time::timeout(FINAL_SAVE_TIMEOUT, wait).await.is_err() {
        warn!("Final save did not finish within {:?}", FINAL_SAVE_TIMEOUT);
        anyhow::bail!("Timed out waiting for the final save");
    }

    info!("Editing session closed");
    Ok(())
}
