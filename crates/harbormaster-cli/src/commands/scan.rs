use super::{json_pretty, EXIT_SUCCESS};
use harbormaster_core::discover;
use std::path::Path;

pub fn run(dir: &Path, max_depth: usize, json_output: bool) -> Result<u8, String> {
    let found = discover(dir, max_depth).map_err(|e| format!("cannot scan {}: {e}", dir.display()))?;

    if json_output {
        println!("{}", json_pretty(&found)?);
        return Ok(EXIT_SUCCESS);
    }

    if found.is_empty() {
        println!("no compose files under {}", dir.display());
        return Ok(EXIT_SUCCESS);
    }
    for manifest in &found {
        println!("{}", manifest.path.display());
        if manifest.services.is_empty() {
            println!("  (no services)");
        } else {
            println!("  {}", manifest.services.join(", "));
        }
    }
    Ok(EXIT_SUCCESS)
}
