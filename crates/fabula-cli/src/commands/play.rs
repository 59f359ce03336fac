use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use fabula_core::{MediaKind, PlayerId, SessionId};
use fabula_play::{FragmentView, MemoryStore, Navigator, PlayError};
use fabula_script::RevealMode;
use fabula_vote::{MemoryPollStore, VoteError, VoteOutcome, VotingCoordinator};

const SHARED_SESSION: SessionId = SessionId(1);

pub async fn run(path: &Path, seed: Option<u64>, fast: bool, shared: bool) -> Result<(), String> {
    let story = super::load_story(path)?;
    let player = story.meta.owner;
    let title = story.meta.title.clone();

    let mut nav = Navigator::new(story, player, Arc::new(MemoryStore::new()));
    if let Some(seed) = seed {
        nav = nav.with_seed(seed);
    }
    let mut coordinator = shared.then(|| {
        let coord = VotingCoordinator::new(Arc::new(MemoryPollStore::new()));
        match seed {
            Some(seed) => coord.with_seed(seed),
            None => coord,
        }
    });

    println!("  {} {title}", "Playing".bold());
    if shared {
        println!("  Vote on forks as \"<player> <number>\"; 'q' quits.");
    } else {
        println!("  Pick choices by number; 'q' quits.");
    }

    let mut view = nav.start().await.map_err(|e| e.to_string())?;
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        render(&nav, &view, fast).await?;

        if view.terminal {
            println!("  {}", "The End.".bold());
            break;
        }
        if view.dead_end {
            println!("  {}", "No way forward from here.".yellow());
            break;
        }

        if let Some(auto) = &view.auto_advance {
            if !fast {
                println!("  {}", format!("(continues in {}s)", auto.delay_secs).dimmed());
                tokio::time::sleep(Duration::from_secs(auto.delay_secs)).await;
            }
            view = nav.auto_timeout().await.map_err(|e| e.to_string())?;
            continue;
        }

        if let Some(coord) = coordinator.as_mut()
            && view.buttons.iter().filter(|b| b.locked.is_none()).count() >= 2
        {
            match vote_round(&mut nav, coord, &mut reader, &mut line).await? {
                PollEnd::Advanced(next) => view = next,
                PollEnd::Stay => {}
                PollEnd::Quit => break,
            }
            continue;
        }

        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // EOF
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let pick = match input.parse::<usize>() {
            Ok(n) if (1..=view.buttons.len()).contains(&n) => n - 1,
            _ => {
                println!("  {}", "enter a number from the list".yellow());
                continue;
            }
        };
        let button = &view.buttons[pick];
        if let Some(requirement) = &button.locked {
            println!("  {} {requirement}", "locked:".yellow());
            continue;
        }

        match nav.select(button.index).await {
            Ok(next) => view = next,
            Err(PlayError::DeadLink(id)) => {
                println!("  {} \"{id}\" has not been written yet", "dead link:".red());
            }
            Err(e) => return Err(e.to_string()),
        }
    }

    Ok(())
}

enum PollEnd {
    /// A choice won and navigation moved.
    Advanced(FragmentView),
    /// The winning choice failed a check; the fragment stands.
    Stay,
    /// The group quit.
    Quit,
}

/// Run one poll on the current fragment: collect votes until a choice
/// reaches the story's threshold, then navigate along the winner.
async fn vote_round(
    nav: &mut Navigator,
    coord: &mut VotingCoordinator,
    reader: &mut impl BufRead,
    line: &mut String,
) -> Result<PollEnd, String> {
    let poll = coord
        .open_poll(
            SHARED_SESSION,
            nav.story(),
            &nav.progress().fragment_id,
            nav.progress().attrs.clone(),
        )
        .await
        .map_err(|e| e.to_string())?;

    println!("  {}", format!("Group vote ({} to win):", poll.threshold).bold());
    for (n, choice) in poll.details.choices.iter().enumerate() {
        println!("  {}. {}", n + 1, choice.label);
    }

    loop {
        print!("vote> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(line) {
            Ok(0) => return Ok(PollEnd::Quit),
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
            return Ok(PollEnd::Quit);
        }

        let mut words = input.split_whitespace();
        let vote = match (
            words.next().and_then(|w| w.parse::<u64>().ok()),
            words.next().and_then(|w| w.parse::<usize>().ok()),
        ) {
            (Some(voter), Some(n)) if (1..=poll.details.choices.len()).contains(&n) => {
                (PlayerId(voter), n - 1)
            }
            _ => {
                println!("  {}", "enter \"<player> <number>\"".yellow());
                continue;
            }
        };

        match coord.cast_vote(SHARED_SESSION, vote.0, vote.1).await {
            Ok(VoteOutcome::Recorded { tally }) => {
                let counts: Vec<String> = tally.iter().map(ToString::to_string).collect();
                println!("  {}", format!("votes: {}", counts.join(" / ")).dimmed());
            }
            Ok(VoteOutcome::Resolved { index, .. }) => {
                // The navigator re-applies the winning effects itself, so
                // the group's progress stays the single source of truth.
                let choice_index = poll.details.choices[index].index;
                let next = nav.select(choice_index).await.map_err(|e| e.to_string())?;
                return Ok(PollEnd::Advanced(next));
            }
            Ok(VoteOutcome::Rejected { notifications }) => {
                for note in &notifications {
                    println!("  {}", note.yellow());
                }
                return Ok(PollEnd::Stay);
            }
            Err(err @ (VoteError::AlreadyVoted(_) | VoteError::InvalidChoice(_))) => {
                println!("  {}", err.to_string().yellow());
            }
            Err(e) => return Err(e.to_string()),
        }
    }
}

async fn render(nav: &Navigator, view: &FragmentView, fast: bool) -> Result<(), String> {
    println!();
    for note in &view.notifications {
        println!("  {}", note.yellow());
    }
    for media in &view.media {
        let kind = match media.kind {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        };
        println!("  {}", format!("[{kind}: {}]", media.file_id).dimmed());
    }

    let steps = nav.current_reveal().map_err(|e| e.to_string())?;
    for (i, step) in steps.iter().enumerate() {
        if i > 0 && !fast {
            tokio::time::sleep(Duration::from_secs(step.delay_secs)).await;
        }
        if step.text.is_empty() {
            continue;
        }
        // A terminal cannot edit what is already printed, so a replace
        // step starts a fresh paragraph instead.
        if i > 0 && step.mode == RevealMode::Replace {
            println!();
        }
        println!("  {}", step.text);
    }
    println!();

    for (n, button) in view.buttons.iter().enumerate() {
        match &button.locked {
            Some(requirement) => println!(
                "  {}. {} {}",
                n + 1,
                button.label,
                format!("(requires {requirement})").dimmed()
            ),
            None => println!("  {}. {}", n + 1, button.label),
        }
    }
    Ok(())
}
