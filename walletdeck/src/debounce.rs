//! Quiet-period gating for rapidly changing input.
//!
//! A [`Debounced`] value keeps the raw input visible immediately while only
//! publishing a *settled* value once no edit has arrived for the configured
//! quiet period. Every edit resets the timer; a burst of edits produces a
//! single settled value, the last one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Default quiet period before an input is considered settled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Lifecycle of a debounced input field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldPhase {
    /// Nothing entered, or the settled value is empty.
    #[default]
    Empty,
    /// An edit was just made and the debounce task has not picked it up.
    Editing,
    /// The quiet-period timer is running.
    Settling,
    /// The last edit has settled and was published.
    Settled,
}

impl FieldPhase {
    /// Whether an edit is waiting to settle.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Editing | Self::Settling)
    }
}

/// An input value with a debounced settled view.
///
/// Must be created inside a Tokio runtime; the timer runs on a spawned task
/// that is aborted when the value is dropped.
#[derive(Debug)]
pub struct Debounced<T> {
    raw: watch::Sender<T>,
    settled: watch::Receiver<T>,
    phase: Arc<watch::Sender<FieldPhase>>,
    quiet: Duration,
    task: JoinHandle<()>,
}

impl<T> Debounced<T>
where
    T: Clone + Default + PartialEq + Send + Sync + 'static,
{
    /// Create a debounced value starting at `initial`.
    #[must_use]
    pub fn new(initial: T, quiet: Duration) -> Self {
        let initial_phase = if initial == T::default() {
            FieldPhase::Empty
        } else {
            FieldPhase::Settled
        };

        let (raw, raw_rx) = watch::channel(initial.clone());
        let (settled_tx, settled) = watch::channel(initial);
        let phase = Arc::new(watch::Sender::new(initial_phase));

        let task = tokio::spawn(Self::run(raw_rx, settled_tx, Arc::clone(&phase), quiet));

        Self {
            raw,
            settled,
            phase,
            quiet,
            task,
        }
    }

    /// Record an edit. The raw value changes immediately and the quiet-period
    /// timer restarts.
    pub fn set(&self, value: T) {
        self.phase.send_replace(FieldPhase::Editing);
        self.raw.send_replace(value);
    }

    /// The latest raw value.
    #[must_use]
    pub fn raw(&self) -> T {
        self.raw.borrow().clone()
    }

    /// The last settled value.
    #[must_use]
    pub fn settled(&self) -> T {
        self.settled.borrow().clone()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> FieldPhase {
        *self.phase.borrow()
    }

    /// The configured quiet period.
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Watch raw edits as they happen.
    #[must_use]
    pub fn subscribe_raw(&self) -> watch::Receiver<T> {
        self.raw.subscribe()
    }

    /// Watch settled values. One notification is delivered per settled
    /// burst of edits.
    #[must_use]
    pub fn subscribe_settled(&self) -> watch::Receiver<T> {
        let mut rx = self.settled.clone();
        rx.mark_unchanged();
        rx
    }

    /// Watch phase transitions.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<FieldPhase> {
        self.phase.subscribe()
    }

    async fn run(
        mut raw: watch::Receiver<T>,
        settled: watch::Sender<T>,
        phase: Arc<watch::Sender<FieldPhase>>,
        quiet: Duration,
    ) {
        while raw.changed().await.is_ok() {
            phase.send_replace(FieldPhase::Settling);

            loop {
                tokio::select! {
                    () = tokio::time::sleep(quiet) => break,
                    changed = raw.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        trace!("debounce timer reset");
                        phase.send_replace(FieldPhase::Settling);
                    }
                }
            }

            let value = raw.borrow_and_update().clone();
            let next = if value == T::default() {
                FieldPhase::Empty
            } else {
                FieldPhase::Settled
            };
            settled.send_replace(value);
            phase.send_replace(next);
        }
    }
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
