use std::path::Path;

use colored::Colorize;

use fabula_core::{Effect, FragmentId, Story};
use fabula_script::parse;

pub fn run(path: &Path) -> Result<(), String> {
    let story = super::load_story(path)?;
    let mut problems: usize = 0;

    for fragment in sorted_fragments(&story) {
        if let Err(e) = FragmentId::validate(fragment.id.as_str()) {
            problems += 1;
            println!("  {} {}", "invalid id:".red(), e);
        }
    }

    for (fragment, index, target) in story.dangling_targets() {
        problems += 1;
        println!(
            "  {} choice {} of \"{}\" targets missing \"{}\"",
            "dangling:".red(),
            index + 1,
            fragment,
            target
        );
    }

    let reachable = story.find_descendants(&FragmentId::root());
    let mut unreachable: Vec<&FragmentId> = story
        .fragments()
        .map(|f| &f.id)
        .filter(|id| !reachable.contains(*id))
        .collect();
    unreachable.sort();
    for id in unreachable {
        problems += 1;
        println!(
            "  {} \"{}\" cannot be reached from the root",
            "unreachable:".yellow(),
            id
        );
    }

    for fragment in sorted_fragments(&story) {
        for (index, choice) in fragment.choices.iter().enumerate() {
            if let Some(source) = &choice.source {
                for error in parse(source).errors {
                    problems += 1;
                    println!(
                        "  {} choice {} of \"{}\": {}",
                        "bad effect:".red(),
                        index + 1,
                        fragment.id,
                        error
                    );
                }
            }
            if choice.text.contains("{{") {
                problems += 1;
                println!(
                    "  {} choice {} of \"{}\" still contains an effect block",
                    "bad effect:".red(),
                    index + 1,
                    fragment.id
                );
            }
        }
        if !fragment.choices.is_empty() && all_choices_hidden_gated(&fragment.choices) {
            println!(
                "  {} every choice of \"{}\" is hidden-gated and can vanish",
                "dead end risk:".yellow(),
                fragment.id
            );
        }
    }

    if problems == 0 {
        println!("  All checks passed for \"{}\".", story.meta.title);
        println!(
            "  {} fragments, {} endings",
            story.fragment_count(),
            story.fragments().filter(|f| f.is_terminal()).count()
        );
        Ok(())
    } else {
        Err(format!(
            "{problems} problem{} found",
            if problems == 1 { "" } else { "s" }
        ))
    }
}

fn sorted_fragments(story: &Story) -> Vec<&fabula_core::Fragment> {
    let mut fragments: Vec<_> = story.fragments().collect();
    fragments.sort_by(|a, b| a.id.cmp(&b.id));
    fragments
}

fn all_choices_hidden_gated(choices: &[fabula_core::Choice]) -> bool {
    choices.iter().all(|choice| {
        choice
            .effects
            .iter()
            .any(|effect| matches!(effect, Effect::Check { hide: true, .. }))
    })
}
