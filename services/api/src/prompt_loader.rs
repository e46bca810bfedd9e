use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use storyteller_core::prompts::Prompts;

/// Built-in prompts, with any `*.md` file in `dir` replacing the prompt
/// named by its file stem.
pub fn load_prompts(dir: Option<&Path>) -> Result<Prompts> {
    let prompts = Prompts::default();
    let Some(dir) = dir else {
        return Ok(prompts);
    };
    let overrides = read_prompt_dir(dir)?;
    tracing::info!("Loaded {} prompt overrides from {}", overrides.len(), dir.display());
    Ok(prompts.with_overrides(&overrides))
}

fn read_prompt_dir(dir: &Path) -> Result<HashMap<String, String>> {
    let mut texts = HashMap::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read prompts directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }

        let key = path
            .file_stem()
            .and_then(|s| s.to_str())
            .context("Could not get file stem for prompt file")?
            .to_string();
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

        texts.insert(key, text);
    }

    Ok(texts)
}
