//! The navigation state machine.
//!
//! A [`Navigator`] drives one player through one story: it resolves
//! fragments (generating missing ones when the story allows), evaluates
//! choice effects for display and on click, persists progress after every
//! transition, and guards auto-advance chains against cycles.

use std::collections::HashSet;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use fabula_core::{Fragment, FragmentId, PlayerId, Story};
use fabula_script::{RevealStep, apply_on_click, evaluate_for_display, render_placeholders, reveal_steps};

use crate::error::{PlayError, PlayResult};
use crate::store::{FragmentGenerator, Progress, ProgressStore, StoryStore};
use crate::view::{AutoAdvance, ButtonView, FragmentView};

/// Drives one player's traversal of one story.
pub struct Navigator {
    story: Story,
    player: PlayerId,
    progress: Progress,
    /// Fragments reached through unbroken auto-advance chaining since the
    /// last manual selection. A repeat target halts further chaining.
    auto_trail: HashSet<FragmentId>,
    rng: StdRng,
    progress_store: Arc<dyn ProgressStore>,
    story_store: Option<Arc<dyn StoryStore>>,
    generator: Option<Arc<dyn FragmentGenerator>>,
}

impl Navigator {
    /// Create a navigator over a loaded story document.
    pub fn new(story: Story, player: PlayerId, progress_store: Arc<dyn ProgressStore>) -> Self {
        Self {
            story,
            player,
            progress: Progress::at_root(),
            auto_trail: HashSet::new(),
            rng: StdRng::from_os_rng(),
            progress_store,
            story_store: None,
            generator: None,
        }
    }

    /// Use a fixed RNG seed, for reproducible draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Attach the generation port used for absent fragments when the story
    /// auto-generates.
    pub fn with_generator(mut self, generator: Arc<dyn FragmentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Attach a story store so generated fragments are persisted.
    pub fn with_story_store(mut self, store: Arc<dyn StoryStore>) -> Self {
        self.story_store = Some(store);
        self
    }

    /// The story being played.
    pub fn story(&self) -> &Story {
        &self.story
    }

    /// The player's current position and attributes.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Resume from persisted progress, or start at the root.
    pub async fn start(&mut self) -> PlayResult<FragmentView> {
        let stored = self
            .progress_store
            .load_progress(&self.story.meta.id, self.player)
            .await?;
        let at = match stored {
            Some(progress) if self.story.contains(&progress.fragment_id) => {
                self.progress = progress;
                self.progress.fragment_id.clone()
            }
            _ => FragmentId::root(),
        };
        self.enter(&at, Vec::new()).await
    }

    /// Move to a fragment and build its view.
    ///
    /// Entering the root restarts the playthrough: attributes and progress
    /// reset. An absent fragment goes through the generation port when the
    /// story auto-generates, and is a [`PlayError::DeadLink`] otherwise,
    /// with progress unchanged.
    pub async fn enter(
        &mut self,
        id: &FragmentId,
        notifications: Vec<String>,
    ) -> PlayResult<FragmentView> {
        if id.is_root() {
            self.progress = Progress::at_root();
            self.auto_trail.clear();
        }

        if !self.story.contains(id) {
            self.generate_missing(id).await?;
        }

        self.progress.fragment_id = id.clone();
        self.progress_store
            .save_progress(&self.story.meta.id, self.player, &self.progress)
            .await?;
        debug!(player = self.player.0, fragment = %id, "entered fragment");

        let fragment = self.story.fragment(id)?;
        Ok(self.build_view(fragment, notifications))
    }

    /// Take the choice at `index` on the current fragment.
    ///
    /// Effects apply in order; a failing check keeps the player on the
    /// current fragment, re-presented with the accumulated notifications
    /// (none when the stop was hidden). Earlier mutations of the click are
    /// kept and persisted in that case. When the click cannot complete at
    /// all (dead link, generation or store failure) the whole click rolls
    /// back, so a retry starts from untouched attributes.
    pub async fn select(&mut self, index: usize) -> PlayResult<FragmentView> {
        let fragment = self.story.fragment(&self.progress.fragment_id)?;
        let choice = fragment
            .choices
            .get(index)
            .ok_or(PlayError::ChoiceUnavailable(index))?;
        if !evaluate_for_display(&choice.effects, &self.progress.attrs).visible {
            return Err(PlayError::ChoiceUnavailable(index));
        }
        let choice = choice.clone();

        let snapshot = self.progress.clone();
        let outcome = apply_on_click(&choice.effects, &mut self.progress.attrs, &mut self.rng);
        if !outcome.may_proceed {
            if let Err(err) = self
                .progress_store
                .save_progress(&self.story.meta.id, self.player, &self.progress)
                .await
            {
                self.progress = snapshot;
                return Err(err);
            }
            let fragment = self.story.fragment(&self.progress.fragment_id)?;
            return Ok(self.build_view(fragment, outcome.notifications));
        }

        self.auto_trail.clear();
        match self.enter(&choice.target, outcome.notifications).await {
            Ok(view) => Ok(view),
            Err(err) => {
                self.progress = snapshot;
                Err(err)
            }
        }
    }

    /// Follow the current fragment's pending auto-advance transition.
    ///
    /// Chaining through fragments whose sole live choice is a timer keeps
    /// going until a target repeats, which halts the chain on that view.
    pub async fn auto_timeout(&mut self) -> PlayResult<FragmentView> {
        let here = self.progress.fragment_id.clone();
        let fragment = self.story.fragment(&here)?;
        let Some((_, choice)) = self.auto_choice(fragment) else {
            // Stale timer; just re-present.
            let fragment = self.story.fragment(&here)?;
            return Ok(self.build_view(fragment, Vec::new()));
        };
        let choice = choice.clone();

        let snapshot = self.progress.clone();
        let outcome = apply_on_click(&choice.effects, &mut self.progress.attrs, &mut self.rng);
        if !outcome.may_proceed {
            if let Err(err) = self
                .progress_store
                .save_progress(&self.story.meta.id, self.player, &self.progress)
                .await
            {
                self.progress = snapshot;
                return Err(err);
            }
            let fragment = self.story.fragment(&here)?;
            return Ok(self.build_view(fragment, outcome.notifications));
        }

        let newly_trailed = self.auto_trail.insert(here.clone());
        let revisit = self.auto_trail.contains(&choice.target);
        match self.enter(&choice.target, outcome.notifications).await {
            Ok(mut view) => {
                if revisit && view.auto_advance.take().is_some() {
                    warn!(fragment = %view.fragment_id, "auto-advance cycle detected, halting chain");
                    self.auto_trail.clear();
                }
                Ok(view)
            }
            Err(err) => {
                self.progress = snapshot;
                if newly_trailed {
                    self.auto_trail.remove(&here);
                }
                Err(err)
            }
        }
    }

    /// The reveal schedule for the current fragment, placeholders rendered
    /// against the player's attributes.
    pub fn current_reveal(&self) -> PlayResult<Vec<RevealStep>> {
        let fragment = self.story.fragment(&self.progress.fragment_id)?;
        Ok(reveal_steps(&fragment.text)
            .into_iter()
            .map(|mut step| {
                step.text = render_placeholders(&step.text, &self.progress.attrs);
                step
            })
            .collect())
    }

    async fn generate_missing(&mut self, id: &FragmentId) -> PlayResult<()> {
        let generator = match (&self.generator, self.story.meta.auto_generate) {
            (Some(generator), true) => Arc::clone(generator),
            _ => return Err(PlayError::DeadLink(id.clone())),
        };

        info!(fragment = %id, story = %self.story.meta.id, "generating missing fragment");
        let batch = generator
            .generate(self.story.meta.owner, &self.story.meta.id, id)
            .await?;
        match batch.first() {
            Some(first) if first.id == *id => {}
            _ => {
                return Err(PlayError::Generation(format!(
                    "generated batch does not start with fragment \"{id}\""
                )));
            }
        }

        for fragment in batch {
            if !self.story.contains(&fragment.id) {
                self.story.add_fragment(fragment)?;
            }
        }

        if let Some(store) = &self.story_store {
            store.save_story(self.story.meta.owner, &self.story).await?;
        }
        Ok(())
    }

    fn build_view(&self, fragment: &Fragment, notifications: Vec<String>) -> FragmentView {
        let mut buttons = Vec::new();
        let mut visible_auto: Vec<(usize, u64)> = Vec::new();
        for (index, choice) in fragment.choices.iter().enumerate() {
            let vis = evaluate_for_display(&choice.effects, &self.progress.attrs);
            if !vis.visible {
                continue;
            }
            match choice.auto_advance() {
                Some(delay) if !vis.is_locked() => visible_auto.push((index, delay)),
                _ => buttons.push(ButtonView {
                    index,
                    label: choice.text.clone(),
                    locked: vis.is_locked().then(|| vis.requirement.clone()),
                }),
            }
        }

        // A timer fires only when it is the single live way forward.
        let auto_advance = match (buttons.is_empty(), visible_auto.as_slice()) {
            (true, [(index, delay)]) => Some(AutoAdvance {
                delay_secs: *delay,
                choice_index: *index,
                target: fragment.choices[*index].target.clone(),
            }),
            _ => None,
        };

        let terminal = fragment.is_terminal();
        let dead_end = !terminal && buttons.is_empty() && auto_advance.is_none();
        let live = buttons.iter().filter(|b| !b.is_locked()).count();

        let first_text = reveal_steps(&fragment.text)
            .into_iter()
            .next()
            .map(|step| step.text)
            .unwrap_or_default();

        FragmentView {
            fragment_id: fragment.id.clone(),
            text: render_placeholders(&first_text, &self.progress.attrs),
            media: fragment.media.clone(),
            buttons,
            is_poll: live >= 2,
            dead_end,
            terminal,
            notifications,
            auto_advance,
        }
    }

    fn auto_choice<'a>(
        &self,
        fragment: &'a Fragment,
    ) -> Option<(usize, &'a fabula_core::Choice)> {
        let view = self.build_view(fragment, Vec::new());
        let auto = view.auto_advance?;
        fragment
            .choices
            .get(auto.choice_index)
            .map(|choice| (auto.choice_index, choice))
    }
}
