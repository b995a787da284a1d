use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::{Context, Result};
use blockform_common::{write_document, RealFileSystem};
use blockform_editor::{builtin_registry, Command, EditorEngine};
use blockform_model::{TemplateDocument, Theme};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub const SAMPLE_DOCUMENT_NAME: &str = "sample.json";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Documents directory
    #[arg(short, long, default_value = "templates")]
    pub dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Blockform project...".bright_blue().bold());

    let config = Config {
        documents_dir: args.dir.clone(),
        ..Config::default()
    };

    let documents_dir = config.get_documents_dir(cwd);
    if !documents_dir.exists() {
        fs::create_dir_all(&documents_dir)
            .with_context(|| format!("creating {}", documents_dir.display()))?;
        println!("  {} Created {}/", "✓".green(), args.dir);
    }

    let sample_path = documents_dir.join(SAMPLE_DOCUMENT_NAME);
    if !sample_path.exists() {
        let sample = sample_document(&config)?;
        write_document(&RealFileSystem, &sample_path, &sample)
            .with_context(|| format!("writing {}", sample_path.display()))?;
        println!("  {} Created {}", "✓".green(), SAMPLE_DOCUMENT_NAME);
    }

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)
        .with_context(|| format!("writing {}", config_path.display()))?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: blockform inspect {}/{}", args.dir, SAMPLE_DOCUMENT_NAME);
    println!("  2. Run: blockform check {}", args.dir);

    Ok(())
}

/// Heading, divider and a two-column block, built through the engine
fn sample_document(config: &Config) -> Result<TemplateDocument> {
    let mut engine = EditorEngine::with_default_document(
        Arc::new(builtin_registry()),
        Theme::default(),
        config.engine_config(),
    );
    let doc = engine.document();
    let body = doc
        .node(&doc.root)
        .and_then(|root| root.slots.first())
        .cloned()
        .context("default document has no body slot")?;

    let heading = engine.insert_new("text", body.clone(), None, Some(&json!({ "content": "Invoice" })))?;
    engine.execute(Command::SetStylePreset {
        node_id: heading,
        preset: Some("heading".to_string()),
    })?;
    engine.insert_new("divider", body.clone(), None, None)?;

    let columns = engine.insert_new("columns", body, None, None)?;
    let column_slots = engine
        .document()
        .node(&columns)
        .map(|node| node.slots.clone())
        .unwrap_or_default();
    for (slot, content) in column_slots.into_iter().zip(["Billed to", "Amount due"]) {
        engine.insert_new("text", slot, None, Some(&json!({ "content": content })))?;
    }

    Ok((*engine.document()).clone())
}
