//! Permission gate in front of every update.

use super::messenger::Keyboard;
use super::texts;
use crate::db::Employee;
use crate::state::AppState;
use anyhow::Result;

/// The sender's directory record, or `None` after telling them they have no access.
/// Strangers also lose any dialogue left over from before their removal.
pub async fn authorize(state: &AppState, chat_id: i64, user_id: i64) -> Result<Option<Employee>> {
    if let Some(employee) = state.directory.find(user_id).await? {
        return Ok(Some(employee));
    }
    state.dialogues.clear(chat_id).await;
    tracing::info!("Rejected update from unknown user {}", user_id);
    state
        .messenger
        .send(chat_id, texts::NO_ACCESS, Keyboard::Remove)
        .await?;
    Ok(None)
}

/// True for admins; everyone else is told they lack rights.
pub async fn require_admin(state: &AppState, chat_id: i64, employee: &Employee) -> Result<bool> {
    if employee.is_admin {
        return Ok(true);
    }
    state
        .messenger
        .send(chat_id, texts::NO_RIGHTS, Keyboard::Keep)
        .await?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::dialogue::DialogueState;
    use crate::test_support::{employee, harness};

    #[tokio::test]
    async fn strangers_are_turned_away_and_lose_dialogue() {
        let h = harness();
        h.state.dialogues.set(555, DialogueState::AwaitingRemoval).await;

        assert!(authorize(&h.state, 555, 555).await.unwrap().is_none());
        assert_eq!(h.messenger.texts_to(555), vec![texts::NO_ACCESS.to_string()]);
        assert_eq!(h.state.dialogues.get(555).await, None);

        let known = authorize(&h.state, 100, 100).await.unwrap().unwrap();
        assert_eq!(known.firstname, "Иван");
    }

    #[tokio::test]
    async fn admin_gate() {
        let h = harness();
        assert!(require_admin(&h.state, 1, &employee(1, "law", "assistant", true)).await.unwrap());
        assert!(!require_admin(&h.state, 100, &employee(100, "law", "lawyer", false)).await.unwrap());
        assert_eq!(h.messenger.texts_to(100), vec![texts::NO_RIGHTS.to_string()]);
    }
}
