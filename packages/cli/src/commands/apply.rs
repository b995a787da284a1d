use super::{load_document, resolve};
use crate::config::Config;
use anyhow::{anyhow, bail, Context, Result};
use blockform_common::{write_document, RealFileSystem};
use blockform_editor::{builtin_registry, validate_document, Command, ComponentRegistry, EditorEngine};
use blockform_model::TemplateDocument;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Template document to edit
    pub file: PathBuf,

    /// JSON array of editor commands
    pub commands: PathBuf,

    /// Write the result here instead of over the input
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Undo this many steps after applying
    #[arg(long, default_value_t = 0)]
    pub undo: usize,

    /// Print the result to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = resolve(cwd, &args.file);
    let doc = load_document(&path)?;

    let commands_path = resolve(cwd, &args.commands);
    let source = std::fs::read_to_string(&commands_path)
        .with_context(|| format!("reading {}", commands_path.display()))?;
    let commands: Vec<Command> = serde_json::from_str(&source)
        .with_context(|| format!("parsing {}", commands_path.display()))?;

    let registry = Arc::new(builtin_registry());
    validate_document(&doc, &registry).with_context(|| format!("validating {}", path.display()))?;

    let mut engine = EditorEngine::new(registry, doc, config.load_theme(cwd)?, config.engine_config());
    let result = run_commands(&mut engine, commands, args.undo)?;

    if args.stdout {
        println!("{}", result.to_json_pretty()?);
        return Ok(());
    }

    let out = args.out.as_ref().map(|out| resolve(cwd, out)).unwrap_or(path);
    write_document(&RealFileSystem, &out, &result).with_context(|| format!("writing {}", out.display()))?;
    println!("  {} Wrote {}", "✓".green(), out.display());

    Ok(())
}

/// Dispatch every command, then undo `undo` steps
///
/// Stops at the first rejected command, and refuses a result that no
/// longer validates against the engine's registry.
pub fn run_commands(engine: &mut EditorEngine, commands: Vec<Command>, undo: usize) -> Result<TemplateDocument> {
    ensure_handlers(engine.registry(), &commands)?;

    for (i, command) in commands.into_iter().enumerate() {
        let name = command.name().to_string();
        engine
            .execute(command)
            .map_err(|err| anyhow!("command {} ({}) rejected: {}", i, name, err))?;
        println!("  {} {}", "✓".green(), name);
    }

    for step in 0..undo {
        if !engine.undo() {
            debug!(requested = undo, done = step, "Undo history exhausted");
            println!("  {} only {} undo steps available", "⚠️".yellow(), step);
            break;
        }
    }

    let result = (*engine.document()).clone();
    validate_document(&result, engine.registry()).context("edited document is invalid")?;
    Ok(result)
}

/// Reject component commands nothing handles before any of them runs
fn ensure_handlers(registry: &ComponentRegistry, commands: &[Command]) -> Result<()> {
    for command in commands {
        if let Command::Component { command_type, .. } = command {
            if registry.command_handler(command_type).is_none() {
                bail!("no component handles command '{}'", command_type);
            }
        }
    }
    Ok(())
}
