//! Perspective tree engine CLI.
//!
//! Runs the generate, move and state-update triggers against a configured
//! model command, checks tree files, and drives whole turns over a session
//! file. JSON results go to stdout; diagnostics go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use perspective::agents::generate::PerspectiveGenerateEngine;
use perspective::agents::movement::PerspectiveMoveTrigger;
use perspective::agents::state_update::StateUpdateTrigger;
use perspective::core::invariants::validate_invariants;
use perspective::core::types::Snapshot;
use perspective::exit_codes;
use perspective::io::config::{DEFAULT_CONFIG_PATH, PerspectiveConfig, load_config, write_config};
use perspective::io::model::CommandModel;
use perspective::io::session::{load_session, write_session};
use perspective::io::tree_store::load_tree;
use perspective::logging;
use perspective::turn::{Engines, run_turn};

#[derive(Parser)]
#[command(
    name = "perspective",
    version,
    about = "Perspective tree engine for conversational agents"
)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

/// Optional conversation context shared by the trigger commands.
#[derive(clap::Args, Debug, Default)]
struct ContextArgs {
    /// JSON object with the current user-state snapshot.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// JSON array of prior conversation turns.
    #[arg(long)]
    history: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file and create the tree directory.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Generate a new perspective tree and print it.
    Generate {
        #[arg(long)]
        text: String,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Decide how to move from the tree's current node and print the decision.
    Decide {
        /// Tree file to navigate.
        #[arg(long)]
        tree: PathBuf,
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "")]
        ai_text: String,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Infer a snapshot patch for the user's latest message and print it.
    UpdateState {
        #[arg(long)]
        text: String,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Check a tree file against the structural invariants.
    Check {
        #[arg(long)]
        tree: PathBuf,
    },
    /// Run one full turn over a session file and write it back.
    Turn {
        #[arg(long)]
        session: PathBuf,
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "")]
        ai_text: String,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::ERROR);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Generate { text, context } => cmd_generate(&cli.config, &text, &context),
        Command::Decide {
            tree,
            text,
            ai_text,
            context,
        } => cmd_decide(&cli.config, &tree, &text, &ai_text, &context),
        Command::UpdateState { text, context } => cmd_update_state(&cli.config, &text, &context),
        Command::Check { tree } => cmd_check(&tree),
        Command::Turn {
            session,
            text,
            ai_text,
        } => cmd_turn(&cli.config, &session, &text, &ai_text),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    let config = if force || !config_path.exists() {
        let config = PerspectiveConfig::default();
        write_config(config_path, &config)?;
        config
    } else {
        load_config(config_path)?
    };
    fs::create_dir_all(&config.tree_dir)
        .with_context(|| format!("create tree directory {}", config.tree_dir.display()))?;
    Ok(exit_codes::OK)
}

fn cmd_generate(config_path: &Path, text: &str, context: &ContextArgs) -> Result<i32> {
    let config = load_config(config_path)?;
    let (snapshot, history) = read_context(context)?;
    let engine = PerspectiveGenerateEngine::new(CommandModel::from_config(&config.model)?, &config)?;
    let tree = engine.generate_tree(text, &snapshot, &history);
    print_json(&tree)?;
    Ok(exit_codes::OK)
}

fn cmd_decide(
    config_path: &Path,
    tree_path: &Path,
    text: &str,
    ai_text: &str,
    context: &ContextArgs,
) -> Result<i32> {
    let config = load_config(config_path)?;
    let (snapshot, history) = read_context(context)?;
    let tree = load_tree(tree_path)?;
    let Some(node) = tree.current_node() else {
        bail!(
            "current_node_id '{}' is not a node in {}",
            tree.current_node_id,
            tree_path.display()
        );
    };
    let trigger = PerspectiveMoveTrigger::new(CommandModel::from_config(&config.model)?, &config)?;
    let decision = trigger.decide_move(node, text, ai_text, &snapshot, &history, &tree);
    print_json(&decision)?;
    Ok(exit_codes::OK)
}

fn cmd_update_state(config_path: &Path, text: &str, context: &ContextArgs) -> Result<i32> {
    let config = load_config(config_path)?;
    let (snapshot, history) = read_context(context)?;
    let trigger = StateUpdateTrigger::new(CommandModel::from_config(&config.model)?, &config)?;
    let patch = trigger.infer_updates(text, &history, &snapshot);
    print_json(&patch)?;
    Ok(exit_codes::OK)
}

fn cmd_check(tree_path: &Path) -> Result<i32> {
    let tree = load_tree(tree_path)?;
    let errors = validate_invariants(&tree);
    if errors.is_empty() {
        println!("ok");
        return Ok(exit_codes::OK);
    }
    for error in &errors {
        println!("{error}");
    }
    Ok(exit_codes::VIOLATIONS)
}

fn cmd_turn(config_path: &Path, session_path: &Path, text: &str, ai_text: &str) -> Result<i32> {
    let config = load_config(config_path)?;
    let mut session = load_session(session_path)?;
    let engines = Engines::new(CommandModel::from_config(&config.model)?, &config)?;
    let outcome = run_turn(&engines, &mut session, text, ai_text, Local::now());
    write_session(session_path, &session)?;
    print_json(&outcome)?;
    Ok(exit_codes::OK)
}

fn read_context(context: &ContextArgs) -> Result<(Snapshot, Vec<Value>)> {
    let snapshot = match &context.snapshot {
        Some(path) => read_json(path)?,
        None => Snapshot::new(),
    };
    let history = match &context.history {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    Ok((snapshot, history))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["perspective", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn parse_decide_with_context() {
        let cli = Cli::parse_from([
            "perspective",
            "decide",
            "--tree",
            "t.json",
            "--text",
            "hi",
            "--history",
            "h.json",
            "--config",
            "alt.toml",
        ]);
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        match cli.command {
            Command::Decide {
                tree,
                text,
                ai_text,
                context,
            } => {
                assert_eq!(tree, PathBuf::from("t.json"));
                assert_eq!(text, "hi");
                assert_eq!(ai_text, "");
                assert_eq!(context.history, Some(PathBuf::from("h.json")));
                assert!(context.snapshot.is_none());
            }
            _ => panic!("expected decide"),
        }
    }

    #[test]
    fn parse_update_state_kebab_case() {
        let cli = Cli::parse_from(["perspective", "update-state", "--text", "累"]);
        assert!(matches!(cli.command, Command::UpdateState { .. }));
    }

    #[test]
    fn read_context_defaults_to_empty() {
        let (snapshot, history) = read_context(&ContextArgs::default()).expect("context");
        assert!(snapshot.is_empty());
        assert!(history.is_empty());
    }

    #[test]
    fn read_context_rejects_wrong_shapes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("snapshot.json");
        fs::write(&path, "[1, 2]").expect("write");
        let args = ContextArgs {
            snapshot: Some(path),
            history: None,
        };
        let err = read_context(&args).expect_err("array is not a snapshot");
        assert!(format!("{err:#}").contains("parse"));
    }
}
