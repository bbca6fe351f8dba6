//! Confirmation gate
//!
//! Asks the user whether a destructive change may proceed. The calling flow
//! suspends until the answer arrives.
//!
//! [`ModalGate`] rejects a second request while one prompt is open
//! ([`ConfirmationError::Concurrent`]) instead of queueing it.

use crate::error::ConfirmationError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

/// Asks the user to confirm a pending change
#[async_trait]
pub trait ConfirmationGate: Send + Sync + Debug {
    /// Present `message`; `true` to proceed, `false` to cancel
    async fn confirm(&self, message: &str) -> Result<bool, ConfirmationError>;
}

/// A prompt currently shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Prompt id, unique per gate
    pub id: u64,
    /// Message shown
    pub message: String,
}

#[derive(Debug)]
struct OpenPrompt {
    id: u64,
    responder: oneshot::Sender<bool>,
}

#[derive(Debug)]
struct ModalInner {
    open: Mutex<Option<OpenPrompt>>,
    shown: watch::Sender<Option<Prompt>>,
    next_id: AtomicU64,
}

/// Modal-dialog style gate with a single prompt slot
///
/// The UI side observes [`ModalGate::subscribe`] (or awaits
/// [`ModalGate::opened`]) and answers through [`ModalGate::answer`].
#[derive(Debug, Clone)]
pub struct ModalGate {
    inner: Arc<ModalInner>,
}

impl ModalGate {
    /// Create gate with no prompt open
    #[must_use]
    pub fn new() -> Self {
        let (shown, _) = watch::channel(None);
        Self {
            inner: Arc::new(ModalInner {
                open: Mutex::new(None),
                shown,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Prompt currently open, if any
    #[must_use]
    pub fn current(&self) -> Option<Prompt> {
        self.inner.shown.borrow().clone()
    }

    /// Watch the open prompt
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Prompt>> {
        self.inner.shown.subscribe()
    }

    /// Wait until a prompt is open and return it
    pub async fn opened(&self) -> Option<Prompt> {
        let mut rx = self.subscribe();
        let prompt = rx.wait_for(Option::is_some).await.ok().and_then(|p| p.clone());
        prompt
    }

    /// Answer the open prompt
    ///
    /// Returns `false` if no prompt was open.
    pub fn answer(&self, proceed: bool) -> bool {
        let Some(open) = self.inner.open.lock().take() else {
            return false;
        };
        self.inner.shown.send_replace(None);
        tracing::info!("Confirmation {} answered: {}", open.id, proceed);
        open.responder.send(proceed).is_ok()
    }

    /// Close the open prompt without answering
    pub fn dismiss(&self) -> bool {
        let dismissed = self.inner.open.lock().take().is_some();
        if dismissed {
            self.inner.shown.send_replace(None);
        }
        dismissed
    }
}

impl Default for ModalGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the prompt slot if the waiting future goes away unanswered
struct SlotGuard<'a> {
    inner: &'a ModalInner,
    id: u64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut open = self.inner.open.lock();
        if open.as_ref().is_some_and(|p| p.id == self.id) {
            *open = None;
            self.inner.shown.send_replace(None);
        }
    }
}

#[async_trait]
impl ConfirmationGate for ModalGate {
    async fn confirm(&self, message: &str) -> Result<bool, ConfirmationError> {
        let (tx, rx) = oneshot::channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut open = self.inner.open.lock();
            if open.is_some() {
                tracing::warn!("Rejecting confirmation, another prompt is open");
                return Err(ConfirmationError::Concurrent);
            }
            *open = Some(OpenPrompt { id, responder: tx });
        }
        let _guard = SlotGuard {
            inner: &self.inner,
            id,
        };

        self.inner.shown.send_replace(Some(Prompt {
            id,
            message: message.to_string(),
        }));
        tracing::debug!("Confirmation {} opened: {}", id, message);

        rx.await.map_err(|_| ConfirmationError::Dismissed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answer_resolves_confirm() {
        let gate = ModalGate::new();

        let waiting = tokio::spawn({
            let gate = gate.clone();
            async move { gate.confirm("Are you sure?").await }
        });

        let prompt = gate.opened().await.unwrap();
        assert_eq!(prompt.message, "Are you sure?");
        assert!(gate.answer(true));

        assert_eq!(waiting.await.unwrap(), Ok(true));
        assert!(gate.current().is_none());
    }

    #[tokio::test]
    async fn second_confirm_is_rejected() {
        let gate = ModalGate::new();

        let first = tokio::spawn({
            let gate = gate.clone();
            async move { gate.confirm("first").await }
        });
        gate.opened().await;

        let second = gate.confirm("second").await;
        assert_eq!(second, Err(ConfirmationError::Concurrent));

        // the first prompt is untouched by the rejected one
        assert_eq!(gate.current().map(|p| p.message), Some("first".to_string()));
        gate.answer(false);
        assert_eq!(first.await.unwrap(), Ok(false));
    }

    #[tokio::test]
    async fn dismiss_reports_dismissed() {
        let gate = ModalGate::new();

        let waiting = tokio::spawn({
            let gate = gate.clone();
            async move { gate.confirm("leave?").await }
        });
        gate.opened().await;

        assert!(gate.dismiss());
        assert_eq!(waiting.await.unwrap(), Err(ConfirmationError::Dismissed));
    }

    #[tokio::test]
    async fn dropped_confirm_frees_the_slot() {
        let gate = ModalGate::new();

        let waiting = tokio::spawn({
            let gate = gate.clone();
            async move { gate.confirm("first").await }
        });
        gate.opened().await;
        waiting.abort();
        let _ = waiting.await;

        assert!(gate.current().is_none());
        assert!(!gate.answer(true));

        let again = tokio::spawn({
            let gate = gate.clone();
            async move { gate.confirm("second").await }
        });
        assert_eq!(gate.opened().await.map(|p| p.message), Some("second".to_string()));
        gate.answer(true);
        assert_eq!(again.await.unwrap(), Ok(true));
    }

    #[test]
    fn answer_without_prompt() {
        let gate = ModalGate::new();
        assert!(!gate.answer(true));
        assert!(!gate.dismiss());
    }
}
