use super::{load_document, resolve};
use crate::config::Config;
use anyhow::{anyhow, Result};
use blockform_editor::{builtin_registry, validate_document, ComponentRegistry};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Document or directory to check (defaults to the configured documents dir)
    pub input: Option<PathBuf>,

    /// Also list documents that passed
    #[arg(short, long)]
    pub all: bool,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = match &args.input {
        Some(input) => resolve(cwd, input),
        None => config.get_documents_dir(cwd),
    };

    println!("🔍 {} Blockform Check", "Starting".green().bold());
    println!("   Input: {}", input.display());
    println!();

    let files = if input.is_file() {
        vec![input.clone()]
    } else if input.is_dir() {
        let files = find_documents(&input);
        println!("   Found {} documents", files.len());
        println!();
        files
    } else {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    };

    let registry = builtin_registry();
    let mut failures = 0;
    for file in &files {
        match check_file(file, &registry) {
            Ok(()) => {
                if args.all {
                    println!("{} {}", "✓".green(), file.display());
                }
            }
            Err(err) => {
                failures += 1;
                println!("{} {}", "✗".red(), file.display());
                println!("  {} {:#}", "error".red().bold(), err);
            }
        }
    }

    println!();
    println!(
        "✨ {} Check complete!",
        if failures > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        }
    );
    println!("   Documents checked: {}", files.len());

    if failures > 0 {
        return Err(anyhow!("{} of {} documents are invalid", failures, files.len()));
    }

    println!("   {} No issues found!", "✓".green());
    Ok(())
}

fn check_file(path: &Path, registry: &ComponentRegistry) -> Result<()> {
    let doc = load_document(path)?;
    validate_document(&doc, registry)?;
    Ok(())
}

/// Every `.json` file under `dir`, sorted, skipping the config file
fn find_documents(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|e| e == "json")
                && path.file_name().is_some_and(|name| name != crate::config::DEFAULT_CONFIG_NAME)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockform_model::TemplateDocument;

    fn write_doc(path: &Path, doc: &TemplateDocument) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, doc.to_json_pretty().unwrap()).unwrap();
    }

    #[test]
    fn test_find_documents_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let doc = TemplateDocument::with_root("root", "root-body");
        write_doc(&dir.path().join("b.json"), &doc);
        write_doc(&dir.path().join("nested/a.json"), &doc);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = find_documents(dir.path());
        assert_eq!(files, vec![dir.path().join("b.json"), dir.path().join("nested/a.json")]);
    }

    #[test]
    fn test_check_fails_on_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();

        let good = TemplateDocument::with_root("root", "root-body");
        let mut bad = good.clone();
        bad.nodes.get_mut("root").unwrap().node_type = "widget".to_string();
        write_doc(&dir.path().join("templates/good.json"), &good);
        write_doc(&dir.path().join("templates/bad.json"), &bad);

        let registry = builtin_registry();
        assert!(check_file(&dir.path().join("templates/good.json"), &registry).is_ok());
        assert!(check_file(&dir.path().join("templates/bad.json"), &registry).is_err());

        let err = check(CheckArgs { input: None, all: true }, &cwd).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }
}
