use std::{path::PathBuf, sync::Arc};

use answer_sync::{
    AnswerSheet, AnswerStore, ConnectivityMonitor, SimulatedLatency, SyncError, SyncEvent,
};
use anyhow::Result;
use clap::Parser;
use shared::domain::{QuizQuestion, StudentId};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast,
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod console_store;
mod render;

use commands::{parse_command, CommandParseError, QuizCommand, HELP};
use console_store::ConsoleStore;
use render::{render_event, render_snapshot};

#[derive(Parser, Debug)]
#[command(
    name = "quiz-cli",
    about = "Answer quiz questions with debounced, offline-tolerant syncing"
)]
struct Args {
    #[arg(long, default_value = "quiz.toml")]
    config: PathBuf,
    #[arg(long)]
    student_id: Option<String>,
    #[arg(long)]
    debounce_ms: Option<u64>,
    #[arg(long)]
    simulate_latency: bool,
    /// Start with connectivity unavailable.
    #[arg(long)]
    offline: bool,
    /// Make every save fail.
    #[arg(long)]
    fail_saves: bool,
}

fn quiz_questions() -> Vec<QuizQuestion> {
    vec![
        QuizQuestion::new(
            "q1",
            "Explain the difference between synchronous and asynchronous operations in high-scale systems.",
        ),
        QuizQuestion::new(
            "q2",
            "How does a message queue like Pub/Sub help in handling a million concurrent writes?",
        ),
    ]
}

fn spawn_renderer(mut events: broadcast::Receiver<SyncEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", render_event(&event)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "quiz: status renderer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn report(result: Result<(), SyncError>) {
    if let Err(err) = result {
        println!("error: {err}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config);
    if let Some(student_id) = args.student_id {
        settings.student_id = Some(student_id);
    }
    if let Some(debounce_ms) = args.debounce_ms {
        settings.debounce_ms = debounce_ms;
    }
    if args.simulate_latency {
        settings.simulate_latency = true;
    }

    let student_id = settings
        .student_id
        .clone()
        .map(StudentId::from)
        .unwrap_or_else(StudentId::generate);
    info!(
        student_id = %student_id,
        debounce_ms = settings.debounce_ms,
        simulate_latency = settings.simulate_latency,
        "quiz: starting session"
    );

    let store = Arc::new(SimulatedLatency::new(
        ConsoleStore::new(student_id, args.fail_saves),
        settings.simulated_latency(),
        settings.simulate_latency,
    ));
    let sheet_store: Arc<dyn AnswerStore> = store.clone();
    let mut sheet = AnswerSheet::new(
        sheet_store,
        ConnectivityMonitor::new(!args.offline),
        settings.sync_config(),
    );
    let renderer = spawn_renderer(sheet.subscribe());

    println!("System Architecture Quiz");
    for question in quiz_questions() {
        println!("{}: {}", question.field_id, question.text);
        sheet.bind(question.field_id, "")?;
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(CommandParseError::Empty) => continue,
            Err(err) => {
                println!("error: {err}");
                continue;
            }
        };
        debug!(command = command.name(), "quiz: dispatching command");

        match command {
            QuizCommand::Type { field_id, text } => report(sheet.input(&field_id, text)),
            QuizCommand::Clear { field_id } => report(sheet.input(&field_id, "")),
            QuizCommand::Offline => sheet.set_online(false),
            QuizCommand::Online => sheet.set_online(true),
            QuizCommand::Latency(enabled) => {
                store.set_enabled(enabled);
                println!(
                    "simulated latency {} ({} ms)",
                    if enabled { "on" } else { "off" },
                    store.delay().as_millis()
                );
            }
            QuizCommand::Wait(duration) => tokio::time::sleep(duration).await,
            QuizCommand::Status => {
                println!("online: {}", sheet.is_online());
                for snapshot in sheet.snapshots() {
                    println!("{}", render_snapshot(&snapshot));
                }
            }
            QuizCommand::Help => println!("{HELP}"),
            QuizCommand::Quit => break,
        }
    }

    for field_id in sheet.field_ids() {
        let last = sheet.unbind(&field_id)?;
        if let Some(unsent) = last.queued_value {
            warn!(
                field_id = %field_id,
                unsent_bytes = unsent.len(),
                "quiz: exiting with an unsent answer"
            );
        }
    }

    tokio::task::yield_now().await;
    renderer.abort();
    Ok(())
}
