//! Per-chat conversation state. A chat without an entry is idle.

use super::commands::Callback;
use crate::config::Period;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Dialogues untouched for this long are dropped by the sweep.
pub const DIALOGUE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    AwaitingKpi { keys: Vec<String> },
    ChoosingPlanPeriod,
    AwaitingPlan { period: Period },
    AwaitingNewEmployee,
    AwaitingRemoval,
    ChoosingInput,
    AwaitingInputValue { input: String },
    AwaitingAnnouncement,
    ConfirmingAnnouncement { text: String },
    ChoosingStatistics,
    ChoosingSection,
    ChoosingPeriod { department: String },
}

impl DialogueState {
    /// Whether an inline button press belongs to the menu this state is waiting on.
    pub fn accepts(&self, callback: &Callback) -> bool {
        matches!(
            (self, callback),
            (DialogueState::ChoosingPlanPeriod, Callback::Plan(_))
                | (DialogueState::ChoosingInput, Callback::Input(_))
                | (DialogueState::ChoosingStatistics, Callback::Stats(_))
                | (DialogueState::ChoosingSection, Callback::Section(_))
                | (DialogueState::ChoosingPeriod { .. }, Callback::Period(_))
        )
    }

    pub fn admin_only(&self) -> bool {
        matches!(
            self,
            DialogueState::AwaitingNewEmployee
                | DialogueState::AwaitingRemoval
                | DialogueState::ChoosingInput
                | DialogueState::AwaitingInputValue { .. }
                | DialogueState::AwaitingAnnouncement
                | DialogueState::ConfirmingAnnouncement { .. }
        )
    }
}

struct Entry {
    state: DialogueState,
    updated_at: Instant,
}

#[derive(Default)]
pub struct DialogueStore {
    inner: RwLock<HashMap<i64, Entry>>,
}

impl DialogueStore {
    pub async fn get(&self, chat_id: i64) -> Option<DialogueState> {
        self.inner
            .read()
            .await
            .get(&chat_id)
            .map(|entry| entry.state.clone())
    }

    pub async fn set(&self, chat_id: i64, state: DialogueState) {
        self.inner.write().await.insert(
            chat_id,
            Entry {
                state,
                updated_at: Instant::now(),
            },
        );
    }

    pub async fn clear(&self, chat_id: i64) -> Option<DialogueState> {
        self.inner.write().await.remove(&chat_id).map(|entry| entry.state)
    }

    /// Drops dialogues idle for longer than `max_idle`; returns how many went.
    pub async fn sweep(&self, max_idle: Duration) -> usize {
        let mut dialogues = self.inner.write().await;
        let before = dialogues.len();
        dialogues.retain(|_, entry| entry.updated_at.elapsed() <= max_idle);
        before - dialogues.len()
    }

    /// Moves the chat from `expected` to `next` unless another update changed it meanwhile.
    pub async fn transition(
        &self,
        chat_id: i64,
        expected: Option<&DialogueState>,
        next: Option<DialogueState>,
    ) -> bool {
        let mut dialogues = self.inner.write().await;
        if dialogues.get(&chat_id).map(|entry| &entry.state) != expected {
            return false;
        }
        match next {
            Some(state) => {
                dialogues.insert(
                    chat_id,
                    Entry {
                        state,
                        updated_at: Instant::now(),
                    },
                );
            }
            None => {
                dialogues.remove(&chat_id);
            }
        }
        true
    }
}
