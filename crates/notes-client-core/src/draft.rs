//! Draft text owned by a view, with revision tickets so that a result
//! computed against an older draft is never written over a newer one.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftTicket {
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The draft changed (or was detached) after the ticket was taken.
    Stale,
}

#[derive(Debug, Default)]
struct DraftState {
    revision: u64,
    text: String,
}

#[derive(Debug, Default)]
pub struct DraftSlot {
    state: Mutex<DraftState>,
}

impl DraftSlot {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(DraftState {
                revision: 0,
                text: text.into(),
            }),
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.lock().text.clone()
    }

    #[must_use]
    pub fn ticket(&self) -> DraftTicket {
        DraftTicket {
            revision: self.lock().revision,
        }
    }

    /// Current text together with a ticket for it, read under one lock.
    #[must_use]
    pub fn checkout(&self) -> (DraftTicket, String) {
        let state = self.lock();
        (
            DraftTicket {
                revision: state.revision,
            },
            state.text.clone(),
        )
    }

    /// User edit: replaces the text and invalidates outstanding tickets.
    pub fn replace_text(&self, text: impl Into<String>) {
        let mut state = self.lock();
        state.text = text.into();
        state.revision += 1;
    }

    /// Invalidates outstanding tickets without touching the text, e.g. when
    /// the owning view goes away.
    pub fn detach(&self) {
        self.lock().revision += 1;
    }

    pub fn apply(&self, ticket: DraftTicket, text: impl Into<String>) -> ApplyOutcome {
        let mut state = self.lock();
        if state.revision != ticket.revision {
            return ApplyOutcome::Stale;
        }
        state.text = text.into();
        state.revision += 1;
        ApplyOutcome::Applied
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DraftState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
