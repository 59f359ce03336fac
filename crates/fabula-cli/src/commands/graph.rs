use std::fmt::Write as _;
use std::path::Path;

use fabula_core::Story;

pub fn run(path: &Path, output: Option<&Path>) -> Result<(), String> {
    let story = super::load_story(path)?;
    let dot = render_dot(&story);

    match output {
        Some(out) => std::fs::write(out, dot)
            .map_err(|e| format!("cannot write {}: {e}", out.display())),
        None => {
            print!("{dot}");
            Ok(())
        }
    }
}

fn render_dot(story: &Story) -> String {
    let mut fragments: Vec<_> = story.fragments().collect();
    fragments.sort_by(|a, b| a.id.cmp(&b.id));

    let mut dot = String::new();
    let _ = writeln!(dot, "digraph \"{}\" {{", escape(story.meta.title.as_str()));
    let _ = writeln!(dot, "  rankdir=LR;");
    let _ = writeln!(dot, "  node [shape=box, fontname=\"sans-serif\"];");

    for fragment in &fragments {
        let label = match first_line(&fragment.text) {
            line if line.is_empty() => fragment.id.to_string(),
            line => format!("{}\\n{}", fragment.id, escape(&line)),
        };
        let _ = writeln!(dot, "  \"{}\" [label=\"{}\"];", fragment.id, label);
    }

    let mut dangling = std::collections::BTreeSet::new();
    for fragment in &fragments {
        for choice in &fragment.choices {
            let _ = writeln!(
                dot,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                fragment.id,
                choice.target,
                escape(&choice.text)
            );
            if !story.contains(&choice.target) {
                dangling.insert(choice.target.clone());
            }
        }
    }
    for target in dangling {
        let _ = writeln!(dot, "  \"{target}\" [style=dashed, color=red];");
    }

    dot.push_str("}\n");
    dot
}

/// First line of the fragment text, truncated for a readable node label.
fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    let mut out: String = line.chars().take(40).collect();
    if line.chars().count() > 40 {
        out.push('…');
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::{Choice, Fragment, FragmentId, PlayerId, StoryId, StoryMeta};

    #[test]
    fn dot_marks_dangling_targets() {
        let mut story = Story::new(StoryMeta::new(StoryId::new("g"), "Graph", PlayerId(1)));
        story
            .add_choice(
                &FragmentId::root(),
                Choice::new("Onward", FragmentId::new("gone").unwrap()),
            )
            .unwrap();
        story
            .add_fragment(Fragment::new(FragmentId::new("isle").unwrap(), "Alone."))
            .unwrap();

        let dot = render_dot(&story);
        assert!(dot.starts_with("digraph \"Graph\" {"));
        assert!(dot.contains("\"main_1\" -> \"gone\" [label=\"Onward\"];"));
        assert!(dot.contains("\"gone\" [style=dashed, color=red];"));
        assert!(dot.contains("\"isle\""));
    }

    #[test]
    fn labels_escape_quotes() {
        assert_eq!(escape(r#"say "hi""#), r#"say \"hi\""#);
    }
}
