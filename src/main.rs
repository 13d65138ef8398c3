use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use voicetask_console::api::{NewWorker, Task, TaskStatus, Worker, WorkerStatus, WorkerUpdate};
use voicetask_console::assignment::{
    ASSIGN_FALLBACK, COMPLETE_FALLBACK, ESCALATE_FALLBACK, STATUS_FALLBACK,
};
use voicetask_console::console::{
    SampleCall, DEFAULT_CALLER_PHONE, DEFAULT_FAILURE_LIMIT, LOGIN_FALLBACK, REGISTER_FALLBACK,
    SAMPLE_CALLS,
};
use voicetask_console::dashboard::{RefreshReport, StatusFilter, TaskFilter, WorkerFilter};
use voicetask_console::roster::{DELETE_FALLBACK, SAVE_FALLBACK, SKILL_OPTIONS};
use voicetask_console::session::FileTokenStore;
use voicetask_console::{Console, ConsoleConfig, ConsoleError};

#[derive(Parser, Debug)]
#[command(name = "voicetask")]
#[command(version)]
#[command(about = "Operator console for the VoiceTask AI dashboard")]
#[command(propagate_version = true)]
struct Args {
    /// Backend base URL (overrides VOICETASK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session file (overrides VOICETASK_TOKEN_PATH)
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and persist the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Register a new business account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        business_name: String,
    },
    /// Clear the persisted session
    Logout,
    /// Show the business the session belongs to
    Whoami,
    /// Refresh and print stats, tasks and available workers
    Dashboard,
    /// List tasks with optional client-side filtering
    Tasks {
        /// "all" or one of new, in_progress, escalated, closed
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// Case-insensitive match on issue, intent or customer phone
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Show one task
    Task { task_id: String },
    /// Assign a worker to a task (auto unless --worker is given)
    Assign {
        task_id: String,
        #[arg(long)]
        worker: Option<String>,
    },
    /// Set a task's lifecycle status
    SetStatus { task_id: String, status: TaskStatus },
    /// Escalate a task to a human
    Escalate {
        task_id: String,
        #[arg(long, default_value = "Escalated by operator")]
        reason: String,
    },
    /// Mark a task complete
    Complete {
        task_id: String,
        #[arg(long)]
        rating: Option<f64>,
    },
    /// List workers
    Workers {
        /// "all" or one of available, busy, offline
        #[arg(long, default_value = "all")]
        status: WorkerFilter,
    },
    /// Manage the worker roster
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },
    /// Send a transcribed call to the backend as if it came in by phone
    SimulateCall {
        #[arg(long, default_value = DEFAULT_CALLER_PHONE)]
        phone: String,
        /// Use a canned transcript (see `voicetask samples`)
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        sample: Option<usize>,
        text: Option<String>,
    },
    /// List the canned call transcripts
    Samples,
    /// Show recent call-processing failures
    Failures {
        #[arg(long, default_value_t = DEFAULT_FAILURE_LIMIT)]
        limit: u32,
    },
}

#[derive(Subcommand, Debug)]
enum WorkerCommands {
    /// Add a worker
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        /// Repeatable; see `voicetask worker skills`
        #[arg(long = "skill")]
        skills: Vec<String>,
        #[arg(long, default_value = "5")]
        max_tasks: u32,
    },
    /// Change fields of an existing worker
    Update {
        worker_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long = "skill")]
        skills: Vec<String>,
        #[arg(long)]
        status: Option<WorkerStatus>,
        #[arg(long)]
        max_tasks: Option<u32>,
    },
    /// Remove a worker
    Remove { worker_id: String },
    /// List the skill tags the dashboard offers
    Skills,
}

#[derive(Serialize)]
struct RefreshOutput<'a> {
    updated: Vec<String>,
    failed: Vec<FailedSlice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks: Option<&'a [Task]>,
}

#[derive(Serialize)]
struct FailedSlice {
    slice: String,
    error: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = ConsoleConfig::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = args.api_url {
        config = config.with_api_url(api_url);
    }
    if let Some(path) = args.token_path {
        config = config.with_token_path(path);
    }

    let token_path = match &config.token_path {
        Some(path) => path.clone(),
        None => FileTokenStore::default_path()?,
    };
    let store = Arc::new(FileTokenStore::new(token_path));
    let console = Console::new(config, store).await?;

    if let Err(e) = run(&console, args.command, args.output).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(console: &Console, command: Commands, output: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Login { email, password } => {
            let nav = console
                .sign_in(&email, &password)
                .await
                .map_err(|e| operator_error(e, LOGIN_FALLBACK))?;
            println!("Logged in. Continue at {}", nav.target().unwrap_or("/dashboard"));
        }
        Commands::Register {
            email,
            password,
            business_name,
        } => {
            let nav = console
                .register(&email, &password, &business_name)
                .await
                .map_err(|e| operator_error(e, REGISTER_FALLBACK))?;
            println!("Registration successful. Sign in at {}", nav.target().unwrap_or(""));
        }
        Commands::Logout => {
            console.sign_out().await?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let identity = console.whoami().await.map_err(|e| operator_error(e, "Failed to load account"))?;
            println!("Business ID: {}", identity.business_id);
        }
        Commands::Dashboard => {
            let fetcher = console.fetcher();
            let report = fetcher.refresh().await;
            let snapshot = fetcher.snapshot().await;
            match output {
                OutputFormat::Json => print_report(&report, Some(snapshot.tasks.as_slice()))?,
                OutputFormat::Table => {
                    if let Some(stats) = &snapshot.stats {
                        println!(
                            "Calls: {}  Tasks: {}  Escalations: {}  Failures: {}  Success: {:.1}%",
                            stats.total_calls,
                            stats.tasks_created,
                            stats.escalations,
                            stats.failures,
                            stats.success_rate
                        );
                    }
                    if let Some(stats) = &snapshot.worker_stats {
                        println!(
                            "Workers: {} total, {} available, {} busy, {} offline",
                            stats.total_workers, stats.available, stats.busy, stats.offline
                        );
                    }
                    println!();
                    print_tasks(&snapshot.tasks);
                    println!();
                    print_workers(&snapshot.workers);
                    print_failures(&report);
                }
            }
        }
        Commands::Tasks { status, search } => {
            let fetcher = console.fetcher();
            let report = fetcher.refresh().await;
            let filter = TaskFilter::new().with_status(status).with_search(search);
            let tasks = fetcher.visible_tasks(&filter).await;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
                OutputFormat::Table => {
                    print_tasks(&tasks);
                    print_failures(&report);
                }
            }
        }
        Commands::Task { task_id } => {
            let token = console.session().bearer().await.map_err(|e| operator_error(e, "Not signed in"))?;
            let task = console
                .api()
                .get_task(&token, &task_id)
                .await
                .map_err(|e| operator_error(e, "Failed to load task"))?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&task)?),
                OutputFormat::Table => {
                    print_tasks(std::slice::from_ref(&task));
                    if let Some(location) = &task.location {
                        println!("Location: {}", location);
                    }
                    if let Some(time) = &task.preferred_time {
                        println!("Preferred time: {}", time);
                    }
                    println!("Customer: {}  Confidence: {:.0}%", task.customer_phone, task.confidence * 100.0);
                }
            }
        }
        Commands::Assign { task_id, worker } => {
            let coordinator = console.coordinator();
            let result = match worker {
                Some(worker_id) => coordinator.manual_assign(&task_id, &worker_id).await,
                None => coordinator.auto_assign(&task_id).await,
            };
            let assignment = result.map_err(|e| operator_error(e, ASSIGN_FALLBACK))?;
            match output {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&assignment.receipt)?)
                }
                OutputFormat::Table => {
                    println!(
                        "Task {} assigned to {} ({})",
                        assignment.receipt.task_id,
                        assignment.receipt.worker_name,
                        assignment.receipt.worker_id
                    );
                    print_failures(&assignment.refresh);
                }
            }
        }
        Commands::SetStatus { task_id, status } => {
            let report = console
                .coordinator()
                .update_status(&task_id, status)
                .await
                .map_err(|e| operator_error(e, STATUS_FALLBACK))?;
            println!("Task {} is now {}", task_id, status);
            print_failures(&report);
        }
        Commands::Escalate { task_id, reason } => {
            let report = console
                .coordinator()
                .escalate(&task_id, &reason)
                .await
                .map_err(|e| operator_error(e, ESCALATE_FALLBACK))?;
            println!("Task {} escalated", task_id);
            print_failures(&report);
        }
        Commands::Complete { task_id, rating } => {
            let report = console
                .coordinator()
                .complete(&task_id, rating)
                .await
                .map_err(|e| operator_error(e, COMPLETE_FALLBACK))?;
            println!("Task {} completed", task_id);
            print_failures(&report);
        }
        Commands::Workers { status } => {
            let fetcher = console.fetcher();
            fetcher.set_worker_filter(status).await;
            let report = fetcher.refresh_roster().await;
            let snapshot = fetcher.snapshot().await;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot.workers)?),
                OutputFormat::Table => {
                    print_workers(&snapshot.workers);
                    print_failures(&report);
                }
            }
        }
        Commands::Worker { command } => run_worker(console, command).await?,
        Commands::SimulateCall {
            phone,
            sample,
            text,
        } => {
            let text = match (sample, text) {
                (_, Some(text)) => text,
                (Some(number), None) => match SampleCall::numbered(number) {
                    Some(sample) => sample.text.to_string(),
                    None => anyhow::bail!(
                        "No sample {}; choose 1-{}",
                        number,
                        SAMPLE_CALLS.len()
                    ),
                },
                (None, None) => anyhow::bail!("Provide a transcript or --sample"),
            };
            let task = console
                .simulate_call(&phone, &text)
                .await
                .map_err(|e| operator_error(e, "Failed to simulate call"))?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&task)?),
                OutputFormat::Table => print_tasks(std::slice::from_ref(&task)),
            }
        }
        Commands::Samples => {
            for (i, sample) in SAMPLE_CALLS.iter().enumerate() {
                println!("{}. {}", i + 1, sample.title);
                println!("   {}", sample.text);
            }
        }
        Commands::Failures { limit } => {
            let logs = console
                .failure_logs(limit)
                .await
                .map_err(|e| operator_error(e, "Failed to load failure logs"))?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&logs)?),
                OutputFormat::Table => {
                    if logs.is_empty() {
                        println!("No failures");
                    }
                    for log in &logs {
                        println!(
                            "{}  {:<16} {}",
                            log.created_at.format("%Y-%m-%d %H:%M:%S"),
                            log.phone_number.as_deref().unwrap_or("-"),
                            log.error_message
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

async fn run_worker(console: &Console, command: WorkerCommands) -> anyhow::Result<()> {
    let roster = console.roster();
    console.fetcher().set_worker_filter(WorkerFilter::All).await;

    match command {
        WorkerCommands::Add {
            name,
            phone,
            skills,
            max_tasks,
        } => {
            let worker = skills
                .into_iter()
                .fold(NewWorker::new(name, phone), NewWorker::with_skill)
                .with_max_tasks(max_tasks);
            let change = roster
                .create_worker(&worker)
                .await
                .map_err(|e| operator_error(e, SAVE_FALLBACK))?;
            if let Some(worker) = change.worker {
                println!("Added worker {} ({})", worker.name, worker.id);
            }
        }
        WorkerCommands::Update {
            worker_id,
            name,
            phone,
            skills,
            status,
            max_tasks,
        } => {
            let update = WorkerUpdate {
                name,
                phone,
                skills: (!skills.is_empty()).then_some(skills),
                status,
                max_tasks,
            };
            let change = roster
                .update_worker(&worker_id, &update)
                .await
                .map_err(|e| operator_error(e, SAVE_FALLBACK))?;
            if let Some(worker) = change.worker {
                print_workers(std::slice::from_ref(&worker));
            }
        }
        WorkerCommands::Remove { worker_id } => {
            roster
                .delete_worker(&worker_id)
                .await
                .map_err(|e| operator_error(e, DELETE_FALLBACK))?;
            println!("Removed worker {}", worker_id);
        }
        WorkerCommands::Skills => {
            for skill in SKILL_OPTIONS {
                println!("{}", skill);
            }
        }
    }

    Ok(())
}

/// Turns a library error into the message shown to the operator.
fn operator_error(err: ConsoleError, fallback: &str) -> anyhow::Error {
    let message = err.operator_message(fallback);
    if err.is_unauthorized() {
        anyhow::anyhow!("{}\nHint: run `voicetask login` to start a new session", message)
    } else {
        anyhow::anyhow!(message)
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }
    println!(
        "{:<12} {:<12} {:<9} {:<20} {:<16} {}",
        "TASK", "STATUS", "URGENCY", "INTENT", "ASSIGNED", "ISSUE"
    );
    for task in tasks {
        println!(
            "{:<12} {:<12} {:<9} {:<20} {:<16} {}",
            task.task_id,
            task.status,
            task.urgency,
            task.intent,
            task.assigned_worker_name.as_deref().unwrap_or("-"),
            task.issue
        );
    }
}

fn print_workers(workers: &[Worker]) {
    if workers.is_empty() {
        println!("No workers");
        return;
    }
    println!(
        "{:<12} {:<20} {:<10} {:<7} {}",
        "WORKER", "NAME", "STATUS", "LOAD", "SKILLS"
    );
    for worker in workers {
        println!(
            "{:<12} {:<20} {:<10} {:<7} {}",
            worker.id,
            worker.name,
            worker.status,
            format!("{}/{}", worker.current_tasks, worker.max_tasks),
            worker.skills.join(", ")
        );
    }
}

fn print_failures(report: &RefreshReport) {
    for (slice, err) in &report.failed {
        eprintln!("Warning: could not refresh {}: {}", slice, err);
    }
}

fn print_report(report: &RefreshReport, tasks: Option<&[Task]>) -> anyhow::Result<()> {
    let output = RefreshOutput {
        updated: report.updated.iter().map(|s| s.to_string()).collect(),
        failed: report
            .failed
            .iter()
            .map(|(slice, err)| FailedSlice {
                slice: slice.to_string(),
                error: err.to_string(),
            })
            .collect(),
        tasks,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
