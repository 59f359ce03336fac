//! Cancellable scheduled edits: timed reveal and auto-advance.
//!
//! Each session owns one [`SessionTasks`] holding at most one pending
//! reveal task and one pending advance task, so there is never more than
//! one writer of displayed content. [`SessionTasks::cancel_all`] must run
//! before any new navigation event and on session restart.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::warn;

use fabula_script::{RevealMode, RevealStep};

use crate::error::PlayResult;
use crate::view::{FragmentView, NavEvent};

/// Output port for displayed session content.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Present a fresh fragment view.
    async fn show(&self, view: &FragmentView) -> PlayResult<()>;

    /// Edit the text of what is currently displayed, keeping its buttons.
    async fn edit_text(&self, text: String) -> PlayResult<()>;
}

/// The pending timer tasks of one session.
#[derive(Default)]
pub struct SessionTasks {
    reveal: Option<JoinHandle<()>>,
    advance: Option<JoinHandle<()>>,
}

impl SessionTasks {
    /// No pending tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any timer is still scheduled.
    pub fn has_pending(&self) -> bool {
        let live = |h: &Option<JoinHandle<()>>| h.as_ref().is_some_and(|h| !h.is_finished());
        live(&self.reveal) || live(&self.advance)
    }

    /// Abort and await both tasks.
    ///
    /// Awaiting an aborted task normally ends in a cancelled `JoinError`;
    /// anything else (a panic inside the task) is logged.
    pub async fn cancel_all(&mut self) {
        for handle in [self.reveal.take(), self.advance.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
            if let Err(err) = handle.await
                && !err.is_cancelled()
            {
                warn!("session task failed: {err}");
            }
        }
    }

    /// Schedule the delayed steps of a reveal sequence.
    ///
    /// The first step is the text already on screen; each later step
    /// sleeps its delay and then edits the displayed text in place,
    /// appending below or replacing per its mode. Replaces any previously
    /// scheduled reveal.
    pub fn schedule_reveal(&mut self, steps: Vec<RevealStep>, renderer: Arc<dyn Renderer>) {
        if let Some(prior) = self.reveal.take() {
            prior.abort();
        }
        let Some((first, rest)) = steps.split_first() else {
            return;
        };
        if rest.is_empty() {
            return;
        }

        let mut shown = first.text.clone();
        let rest = rest.to_vec();
        self.reveal = Some(tokio::spawn(async move {
            for step in rest {
                sleep(Duration::from_secs(step.delay_secs)).await;
                match step.mode {
                    RevealMode::Append if !shown.is_empty() => {
                        shown.push_str("\n\n");
                        shown.push_str(&step.text);
                    }
                    RevealMode::Append | RevealMode::Replace => shown = step.text.clone(),
                }
                if let Err(err) = renderer.edit_text(shown.clone()).await {
                    warn!("reveal edit failed: {err}");
                    return;
                }
            }
        }));
    }

    /// Schedule an auto-advance timeout event.
    ///
    /// Sleeps the delay and then emits [`NavEvent::AutoTimeout`] on the
    /// session's event channel. Replaces any previously scheduled advance.
    pub fn schedule_advance(&mut self, delay_secs: u64, events: mpsc::Sender<NavEvent>) {
        if let Some(prior) = self.advance.take() {
            prior.abort();
        }
        self.advance = Some(tokio::spawn(async move {
            sleep(Duration::from_secs(delay_secs)).await;
            let _ = events.send(NavEvent::AutoTimeout).await;
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingRenderer {
        edits: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Renderer for RecordingRenderer {
        async fn show(&self, _view: &FragmentView) -> PlayResult<()> {
            Ok(())
        }

        async fn edit_text(&self, text: String) -> PlayResult<()> {
            self.edits.lock().await.push(text);
            Ok(())
        }
    }

    fn step(delay_secs: u64, mode: RevealMode, text: &str) -> RevealStep {
        RevealStep {
            delay_secs,
            mode,
            text: text.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn advance_emits_timeout_event() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut tasks = SessionTasks::new();
        tasks.schedule_advance(5, tx);
        assert_eq!(rx.recv().await, Some(NavEvent::AutoTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_advance_never_fires() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut tasks = SessionTasks::new();
        tasks.schedule_advance(5, tx);
        tasks.cancel_all().await;
        // The aborted task dropped the only sender, so the channel closes
        // without a message.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_applies_steps_in_order() {
        let renderer = Arc::new(RecordingRenderer::default());
        let mut tasks = SessionTasks::new();
        tasks.schedule_reveal(
            vec![
                step(0, RevealMode::Replace, "A knock."),
                step(3, RevealMode::Append, "The door opens."),
                step(5, RevealMode::Replace, "Darkness."),
            ],
            Arc::clone(&renderer) as Arc<dyn Renderer>,
        );
        let handle = tasks.reveal.take().unwrap();
        handle.await.unwrap();

        let edits = renderer.edits.lock().await;
        assert_eq!(
            *edits,
            vec![
                "A knock.\n\nThe door opens.".to_string(),
                "Darkness.".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn append_onto_empty_screen_replaces() {
        let renderer = Arc::new(RecordingRenderer::default());
        let mut tasks = SessionTasks::new();
        tasks.schedule_reveal(
            vec![
                step(0, RevealMode::Replace, ""),
                step(2, RevealMode::Append, "Suddenly..."),
            ],
            Arc::clone(&renderer) as Arc<dyn Renderer>,
        );
        tasks.reveal.take().unwrap().await.unwrap();

        let edits = renderer.edits.lock().await;
        assert_eq!(*edits, vec!["Suddenly...".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn single_step_schedules_nothing() {
        let renderer = Arc::new(RecordingRenderer::default());
        let mut tasks = SessionTasks::new();
        tasks.schedule_reveal(
            vec![step(0, RevealMode::Replace, "All at once.")],
            renderer,
        );
        assert!(!tasks.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_reveal() {
        let renderer = Arc::new(RecordingRenderer::default());
        let mut tasks = SessionTasks::new();
        tasks.schedule_reveal(
            vec![
                step(0, RevealMode::Replace, "Old."),
                step(100, RevealMode::Replace, "Never shown."),
            ],
            Arc::clone(&renderer) as Arc<dyn Renderer>,
        );
        tasks.schedule_reveal(
            vec![
                step(0, RevealMode::Replace, "New."),
                step(1, RevealMode::Replace, "Shown."),
            ],
            Arc::clone(&renderer) as Arc<dyn Renderer>,
        );
        tasks.reveal.take().unwrap().await.unwrap();
        tasks.cancel_all().await;

        let edits = renderer.edits.lock().await;
        assert_eq!(*edits, vec!["Shown.".to_string()]);
    }
}
