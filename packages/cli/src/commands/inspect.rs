use super::{load_document, resolve};
use crate::config::Config;
use anyhow::{Context, Result};
use blockform_common::{walk_document, walk_node, walk_slot, Visitor};
use blockform_editor::{builtin_registry, validate_document, EditorEngine};
use blockform_model::{Node, Slot, TemplateDocument};
use clap::Args;
use colored::Colorize;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Template document to inspect
    pub file: PathBuf,

    /// Print resolved styles under each node
    #[arg(short, long)]
    pub styles: bool,
}

pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = resolve(cwd, &args.file);
    let doc = load_document(&path)?;

    let registry = Arc::new(builtin_registry());
    validate_document(&doc, &registry).with_context(|| format!("validating {}", path.display()))?;

    let engine = EditorEngine::new(registry, doc, config.load_theme(cwd)?, config.engine_config());

    println!("{} {}", "📄".bright_blue(), path.display().to_string().bright_white());
    print!("{}", render_tree(&engine, args.styles));
    println!();
    println!(
        "   {} nodes, {} slots, theme '{}'",
        engine.document().nodes.len(),
        engine.document().slots.len(),
        engine.theme().id
    );

    Ok(())
}

/// Indented block tree, one line per node and slot
pub fn render_tree(engine: &EditorEngine, with_styles: bool) -> String {
    let doc = engine.document();
    let mut printer = TreePrinter {
        engine,
        with_styles,
        out: String::new(),
    };
    walk_document(&mut printer, &doc);
    printer.out
}

struct TreePrinter<'a> {
    engine: &'a EditorEngine,
    with_styles: bool,
    out: String,
}

impl TreePrinter<'_> {
    fn indent(depth: usize) -> String {
        "  ".repeat(depth * 2 + 1)
    }
}

impl Visitor for TreePrinter<'_> {
    fn visit_node(&mut self, doc: &TemplateDocument, node: &Node, depth: usize) {
        let indent = Self::indent(depth);
        let _ = write!(self.out, "{}{} {}", indent, node.node_type.green().bold(), node.id.dimmed());
        if let Some(preset) = &node.style_preset {
            let _ = write!(self.out, " [{}]", preset.cyan());
        }
        let _ = writeln!(self.out, " (depth {})", depth);

        if self.with_styles {
            if let Some(styles) = self.engine.resolved_node_styles(&node.id) {
                for (key, value) in &styles {
                    let _ = writeln!(self.out, "{}  · {}: {}", indent, key.dimmed(), value);
                }
            }
        }

        walk_node(self, doc, node, depth);
    }

    fn visit_slot(&mut self, doc: &TemplateDocument, slot: &Slot, depth: usize) {
        let _ = writeln!(
            self.out,
            "{}  {} {}",
            Self::indent(depth),
            format!("#{}", slot.name).yellow(),
            format!("({} children)", slot.children.len()).dimmed()
        );
        walk_slot(self, doc, slot, depth);
    }
}
