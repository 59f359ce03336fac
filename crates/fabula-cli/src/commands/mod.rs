pub mod check;
pub mod graph;
pub mod play;

use std::path::Path;

use fabula_core::{FragmentId, Story};

/// Load and minimally validate a story document.
fn load_story(path: &Path) -> Result<Story, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let story: Story =
        serde_json::from_str(&raw).map_err(|e| format!("invalid story document: {e}"))?;
    if !story.contains(&FragmentId::root()) {
        return Err(format!(
            "story document has no \"{}\" root fragment",
            FragmentId::root()
        ));
    }
    Ok(story)
}
