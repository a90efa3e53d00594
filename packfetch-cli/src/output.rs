//! Console rendering of installation progress.
//!
//! Stage progress is shown with spinners; per-mod progress is printed as one
//! status line per mod so the scrollback keeps a full record of the run.

use std::io::{self, ErrorKind, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use packfetch::manager::download::{
    AcquireEvent, AcquireEventCallback, ComponentRef, RetryDecision, RetryPrompt,
};
use packfetch::manager::{InstallProgressCallback, InstallReport, InstallStage};

/// Console output shared by the installer callbacks.
#[derive(Clone, Default)]
pub struct ConsoleOutput {
    /// Whether a status line is waiting for its result.
    line_open: Arc<Mutex<bool>>,
    spinner: Arc<Mutex<Option<ProgressBar>>>,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback printing per-mod status lines.
    pub fn event_callback(&self) -> AcquireEventCallback {
        let line_open = Arc::clone(&self.line_open);
        Box::new(move |event: &AcquireEvent| {
            let Ok(mut open) = line_open.lock() else {
                return;
            };
            let text = render_event(event, &mut open);
            if !text.is_empty() {
                let mut stdout = io::stdout();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
        })
    }

    /// Callback driving the stage spinners.
    pub fn stage_callback(&self) -> InstallProgressCallback {
        let spinner = Arc::clone(&self.spinner);
        Box::new(move |stage: InstallStage, progress: f64, _message: &str| {
            let Ok(mut current) = spinner.lock() else {
                return;
            };

            if let Some(pb) = current.take() {
                pb.finish_with_message(format!("{}... {}", pb.message(), style("Done.").green()));
            }

            match stage {
                InstallStage::AcquiringMods | InstallStage::Merging | InstallStage::Complete => {
                    if progress >= 1.0 && stage == InstallStage::Merging {
                        println!("Overriding files... {}", style("Done.").green());
                    }
                }
                _ if progress < 1.0 => *current = Some(new_spinner(stage.name())),
                _ => {}
            }
        })
    }

    /// Stop any running spinner without marking it done.
    pub fn abandon(&self) {
        if let Ok(mut current) = self.spinner.lock() {
            if let Some(pb) = current.take() {
                pb.abandon_with_message(format!("{}... {}", pb.message(), style("Failed.").red()));
            }
        }
    }
}

fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Text for one acquisition event.
///
/// `line_open` tracks whether the previous output ended mid-line waiting for
/// a result ("Downloading x... ").
pub fn render_event(event: &AcquireEvent, line_open: &mut bool) -> String {
    match event {
        AcquireEvent::PassStarted { pass, total } => {
            let prefix = close_line(line_open);
            if *pass == 1 {
                format!("{}Downloading {} mods...\n", prefix, total)
            } else {
                format!("{}Retrying {} mods (attempt {})...\n", prefix, total, pass)
            }
        }
        AcquireEvent::Skipped { file_name, .. } => format!(
            "{}Already downloaded {}. {}\n",
            close_line(line_open),
            file_name,
            style("Skipping...").cyan()
        ),
        AcquireEvent::Resolving { .. } => String::new(),
        AcquireEvent::Downloading { file_name, .. } => {
            let prefix = close_line(line_open);
            *line_open = true;
            format!("{}Downloading {}... ", prefix, file_name)
        }
        AcquireEvent::Acquired {
            file_name, fresh, ..
        } => {
            let result = if *fresh {
                style("Done.").green()
            } else {
                style("Already present.").cyan()
            };
            if std::mem::take(line_open) {
                format!("{}\n", result)
            } else {
                format!("{} {}\n", file_name, result)
            }
        }
        AcquireEvent::Failed { component, reason } => {
            let failed = style("Failed.").red();
            let reason = style(format!("({})", reason)).dim();
            if std::mem::take(line_open) {
                format!("{} {}\n", failed, reason)
            } else {
                format!(
                    "Attempted to acquire mod information for {}. {} {}\n",
                    component, failed, reason
                )
            }
        }
        AcquireEvent::Cancelled { .. } => {
            if std::mem::take(line_open) {
                format!("{}\n", style("Interrupted.").yellow())
            } else {
                String::new()
            }
        }
        AcquireEvent::PassFinished { failures, .. } => {
            let prefix = close_line(line_open);
            if failures.is_empty() {
                return prefix.to_string();
            }
            let mut text = format!("{}Failed to download {} mods:\n", prefix, failures.len());
            for component in failures {
                text.push_str(&format!("  - {}\n", component));
            }
            text
        }
        AcquireEvent::LedgerSaved => format!(
            "{}Saving download progress... {}\n",
            close_line(line_open),
            style("Done.").green()
        ),
    }
}

/// Line break ending a pending status line, if any.
fn close_line(open: &mut bool) -> &'static str {
    if std::mem::take(open) {
        "\n"
    } else {
        ""
    }
}

/// Asks on the terminal whether failed mods should be retried.
///
/// The terminal is in raw mode while the prompt is open, so Ctrl+C arrives
/// as an interrupted read instead of a signal. It is forwarded to `cancel`.
pub struct ConfirmPrompt {
    cancel: CancellationToken,
}

impl ConfirmPrompt {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl RetryPrompt for ConfirmPrompt {
    fn retry_failed(&self, failures: &[ComponentRef]) -> RetryDecision {
        let answer = Confirm::new()
            .with_prompt(format!(
                "{} mod(s) could not be downloaded. Would you like to try again?",
                failures.len()
            ))
            .default(true)
            .interact();

        decide(answer, &self.cancel)
    }
}

/// Map a prompt answer to a decision, cancelling on an interrupted read.
fn decide(answer: dialoguer::Result<bool>, cancel: &CancellationToken) -> RetryDecision {
    match answer {
        Ok(true) => RetryDecision::Retry,
        Ok(false) => RetryDecision::Abort,
        Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::Interrupted => {
            cancel.cancel();
            RetryDecision::Abort
        }
        Err(e) => {
            warn!(error = %e, "Retry prompt failed, aborting");
            RetryDecision::Abort
        }
    }
}

/// Print the result of a finished installation.
pub fn print_summary(report: &InstallReport) {
    println!();
    println!("{}", style("Modpack download finished.").green().bold());
    println!("  Pack:      {} ({})", report.pack_name, report.project_id);
    println!("  Release:   {}", report.release_id);
    println!("  Mods:      {}", report.components);
    println!("  Installed: {}", report.modpack_dir.display());
    println!(
        "  Guide:     {}",
        report.release_dir.join(packfetch::manager::GUIDE_FILE_NAME).display()
    );
}
