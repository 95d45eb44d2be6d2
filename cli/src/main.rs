use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

use importer::config::{apply_env_overrides, load_config, validate_config};
use importer::{
    ClientConfig, ImportSession, JobStatus, JobTicket, Notification, NotificationKind,
    ProgressEvent, TaskSummary,
};

#[derive(Parser, Debug)]
#[command(name = "importer", version, about = "Upload CSV product imports and follow their progress")]
struct Args {
    /// Config file (defaults to <config dir>/importer/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the import API, overriding config and environment
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print snapshots and tasks as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Upload a CSV file and follow the import
    Upload {
        file: PathBuf,
        /// Print the job id and exit instead of following progress
        #[arg(long)]
        detach: bool,
    },
    /// Follow an existing job until it finishes
    Watch { job_id: String },
    /// List known import jobs
    Tasks,
    /// Re-queue a failed job and follow it
    Retry {
        job_id: String,
        #[arg(long)]
        detach: bool,
    },
}

fn init_logging() -> anyhow::Result<()> {
    tracing_log::LogTracer::init().context("install log bridge")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("install tracing subscriber")?;
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("importer").join("config.json"))
}

/// Config file, then `IMPORTER_API_URL`, then `--api-url`.
fn resolve_config(path: Option<&Path>, api_url: Option<&str>) -> anyhow::Result<ClientConfig> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                info!("Using config file {:?}", path);
                load_config(&path)?
            }
            None => ClientConfig::default(),
        },
    };

    let mut config = apply_env_overrides(config)?;
    if let Some(url) = api_url {
        config.api_url = url.trim().to_string();
        validate_config(&config)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging()?;

    let config = resolve_config(args.config.as_deref(), args.api_url.as_deref())?;
    info!("Import API at {}", config.base_url());
    let session = ImportSession::new(config)?;
    let output = Output { json: args.json };

    match args.cmd {
        Cmd::Upload { file, detach } => {
            let watch = Watch::new(&session);
            let job_id = session
                .submit_path(&file)
                .await
                .with_context(|| format!("upload {}", file.display()))?;
            if detach {
                session.teardown();
                println!("{}", job_id);
                return Ok(ExitCode::SUCCESS);
            }
            watch.follow(&session, &output).await
        }
        Cmd::Watch { job_id } => {
            if let Err(e) = session.mount().await {
                warn!("Could not load task list: {}", e);
            }
            let watch = Watch::new(&session);
            if session.reattach(&job_id).is_err() {
                warn!("Job {} is not in the task list, polling it anyway", job_id);
                session.attach(&job_id);
            }
            watch.follow(&session, &output).await
        }
        Cmd::Tasks => {
            session.mount().await.context("load task list")?;
            output.tasks(&session.tasks())?;
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Retry { job_id, detach } => {
            let watch = Watch::new(&session);
            session
                .retry(&job_id)
                .await
                .with_context(|| format!("retry job {}", job_id))?;
            if detach {
                session.teardown();
                println!("{}", job_id);
                return Ok(ExitCode::SUCCESS);
            }
            watch.follow(&session, &output).await
        }
    }
}

/// Receivers taken before a job is attached, so no snapshot is missed.
struct Watch {
    progress: broadcast::Receiver<ProgressEvent>,
    notifications: broadcast::Receiver<Notification>,
}

impl Watch {
    fn new(session: &ImportSession) -> Self {
        Self {
            progress: session.subscribe_progress(),
            notifications: session.subscribe_notifications(),
        }
    }

    /// Prints snapshots until the job reaches a terminal state.
    async fn follow(mut self, session: &ImportSession, output: &Output) -> anyhow::Result<ExitCode> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                event = self.progress.recv() => match event {
                    Ok(event) => {
                        output.snapshot(&event)?;
                        if event.ticket.is_terminal() {
                            self.flush_notifications(output);
                            return Ok(exit_code(&event.ticket));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Skipped {} progress updates", skipped);
                    }
                    Err(RecvError::Closed) => bail!("progress stream closed"),
                },
                note = self.notifications.recv() => {
                    if let Ok(note) = note {
                        output.notification(&note);
                    }
                }
                _ = &mut ctrl_c => {
                    session.teardown();
                    eprintln!("Stopped following job");
                    return Ok(ExitCode::from(130));
                }
            }
        }
    }

    fn flush_notifications(&mut self, output: &Output) {
        while let Ok(note) = self.notifications.try_recv() {
            output.notification(&note);
        }
    }
}

fn exit_code(ticket: &JobTicket) -> ExitCode {
    match ticket.status {
        JobStatus::Complete => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn snapshot(&self, event: &ProgressEvent) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }

        let ticket = &event.ticket;
        let mut line = format!(
            "{:<10} {:>6.1}%  {}/{}",
            ticket.status.as_str(),
            ticket.percent,
            ticket.processed,
            ticket.total
        );
        if !ticket.last_message.is_empty() {
            line.push_str("  ");
            line.push_str(&ticket.last_message);
        }
        println!("{}", line);
        Ok(())
    }

    fn notification(&self, note: &Notification) {
        if self.json {
            return;
        }
        let marker = match note.kind {
            NotificationKind::Info => "*",
            NotificationKind::Success => "+",
            NotificationKind::Error => "!",
        };
        eprintln!("{} {}: {}", marker, note.title, note.message);
    }

    fn tasks(&self, tasks: &[TaskSummary]) -> anyhow::Result<()> {
        if self.json {
            for task in tasks {
                println!("{}", serde_json::to_string(task)?);
            }
            return Ok(());
        }

        if tasks.is_empty() {
            println!("No import jobs");
            return Ok(());
        }

        println!(
            "{:<38} {:<10} {:>17} {:>7}  FILE",
            "JOB", "STATUS", "PROCESSED", "RETRIES"
        );
        for task in tasks {
            println!(
                "{:<38} {:<10} {:>17} {:>7}  {}",
                task.job_id,
                task.status.as_str(),
                format!("{}/{}", task.processed, task.total),
                task.retries,
                task.filename
            );
            if task.status == JobStatus::Failed && !task.error.is_empty() {
                println!("    error: {}", task.error);
            }
        }
        Ok(())
    }
}
