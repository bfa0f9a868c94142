use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use acquaint_core::dialogue::api::{EngineConfig, GetToKnowYou};
use acquaint_core::dialogue::memory::MemoryGetToKnowYou;
use acquaint_core::dialogue::roster::{FriendStore, InMemoryFriendStore};
use acquaint_core::dialogue::verbal::VerbalGetToKnowYou;
use acquaint_core::event::{Event, Payload};
use acquaint_core::grouping::group_by::GroupByConfig;
use acquaint_core::service::service::{GetToKnowYouService, ServiceTopics};
use acquaint_core::shared::constants::{
    DEFAULT_CHURN_PATIENCE, DEFAULT_EMPTY_PATIENCE, DEFAULT_GAZE_SAMPLES,
};

/// Get-to-know-you dialogue agent.
///
/// Without arguments, starts an interactive camera-less session on stdin.
#[derive(Parser)]
#[command(name = "acquaint")]
struct Cli {
    /// Replay a recorded event script (one JSON event per line) through the
    /// face pipeline instead of starting an interactive session.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Friends roster file: a JSON object mapping identity to name.
    /// Loaded at startup, written back when the session ends.
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Gaze samples collected before asking a stranger's name.
    #[arg(long, default_value_t = DEFAULT_GAZE_SAMPLES)]
    gaze_samples: usize,

    /// Consecutive empty detections before falling back to the start state.
    #[arg(long, default_value_t = DEFAULT_EMPTY_PATIENCE)]
    empty_patience: u32,

    /// Consecutive foreign identities tolerated once a speaker is known.
    #[arg(long, default_value_t = DEFAULT_CHURN_PATIENCE)]
    churn_patience: u32,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let store = load_roster(cli.roster.as_deref())?;
    let config = EngineConfig {
        gaze_samples: cli.gaze_samples,
        empty_patience: cli.empty_patience,
        churn_patience: cli.churn_patience,
        ..EngineConfig::default()
    };

    if let Some(script) = &cli.replay {
        replay(script, config, store)
    } else {
        interactive(store, cli.roster.as_deref())
    }
}

/// Interactive camera-less session: one response per input line.
fn interactive(
    store: InMemoryFriendStore,
    roster_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = VerbalGetToKnowYou::new(Box::new(store));

    if let Some(greeting) = engine.response() {
        println!("< {greeting}");
    }

    for line in io::stdin().lock().lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "quit" {
            break;
        }
        if let Some(reply) = engine.utterance_detected(text) {
            println!("< {reply}");
        }
        if let Some(speaker) = engine.speaker() {
            log::info!("Speaker resolved: {} ({})", speaker.name, speaker.id);
        }
    }

    save_roster(roster_path, engine.friends())
}

/// Deterministic replay of a recorded event script through the full face
/// pipeline; prints everything the service publishes.
fn replay(
    script: &Path,
    config: EngineConfig,
    store: InMemoryFriendStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let (out_tx, out_rx) = crossbeam_channel::unbounded();
    let engine = MemoryGetToKnowYou::new(config, Box::new(store));
    let mut service = GetToKnowYouService::new(
        Box::new(engine),
        GroupByConfig::default(),
        ServiceTopics::default(),
        out_tx,
    );

    let file = fs::File::open(script)?;
    for (number, line) in io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event =
            serde_json::from_str(&line).map_err(|e| format!("line {}: {e}", number + 1))?;
        service.process(Some(event));
        while let Ok(published) = out_rx.try_recv() {
            print_published(&published);
        }
    }
    Ok(())
}

fn print_published(event: &Event) {
    match &event.payload {
        Payload::Response { text } => println!("< {text}"),
        Payload::Speaker { id, name } => println!("* speaker: {name} ({id})"),
        other => log::debug!("Unhandled published payload {other:?}"),
    }
}

fn load_roster(path: Option<&Path>) -> Result<InMemoryFriendStore, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(InMemoryFriendStore::new());
    };
    if !path.exists() {
        return Ok(InMemoryFriendStore::new());
    }
    let data = fs::read_to_string(path)?;
    let entries: HashMap<String, String> = serde_json::from_str(&data)?;
    Ok(InMemoryFriendStore::from_entries(entries))
}

fn save_roster(
    path: Option<&Path>,
    store: &dyn FriendStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(());
    };
    let entries: HashMap<String, String> = store.entries().into_iter().collect();
    fs::write(path, serde_json::to_string_pretty(&entries)?)?;
    Ok(())
}
