use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::load_step_path;

#[derive(Args, Clone, Debug)]
pub struct PathsArgs {
    /// Directory holding test-path JSON files
    pub dir: PathBuf,
}

pub fn cmd_paths(args: PathsArgs) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(&args.dir)
        .with_context(|| format!("reading {}", args.dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    if entries.is_empty() {
        println!("No test paths found in {}", args.dir.display());
        return Ok(());
    }

    println!("Available test paths:");
    for path in entries {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match load_step_path(&path) {
            Ok(step_path) => {
                let description = step_path.description.unwrap_or_default();
                println!("  {name}  ({} steps)  {description}", step_path.steps.len());
            }
            Err(err) => println!("  {name}  (unreadable: {err})"),
        }
    }
    Ok(())
}
