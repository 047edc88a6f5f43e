//! Routes each incoming text or button press through access control, commands, the main
//! menu and the chat's active dialogue.

use super::access;
use super::admin;
use super::commands::{main_menu, Callback, Command, MenuAction};
use super::dialogue::DialogueState;
use super::kpi;
use super::menu;
use super::messenger::Keyboard;
use super::texts;
use crate::db::Employee;
use crate::state::AppState;
use anyhow::Result;

/// What the webhook hands over, stripped of Telegram types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text {
        chat_id: i64,
        user_id: i64,
        text: String,
    },
    Callback {
        id: String,
        chat_id: i64,
        user_id: i64,
        data: String,
    },
}

/// How a dialogue moves after one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Back to idle.
    Done,
    /// Keep the current state and wait for another answer.
    Stay,
    Next(DialogueState),
}

/// One authorized chat.
pub struct Chat<'a> {
    pub state: &'a AppState,
    pub chat_id: i64,
    pub employee: Employee,
}

impl Chat<'_> {
    pub async fn reply(&self, text: &str, keyboard: Keyboard) -> Result<()> {
        self.state.messenger.send(self.chat_id, text, keyboard).await
    }

    /// Reply and bring back the main menu.
    pub async fn reply_menu(&self, text: &str) -> Result<()> {
        self.reply(text, main_menu(self.employee.is_admin)).await
    }

    /// Stores the step's outcome unless a newer update (such as /cancel) replaced `current`.
    async fn apply(&self, current: Option<DialogueState>, step: Step) {
        let next = match step {
            Step::Done => None,
            Step::Stay => current.clone(),
            Step::Next(next) => Some(next),
        };
        if !self
            .state
            .dialogues
            .transition(self.chat_id, current.as_ref(), next)
            .await
        {
            tracing::debug!(
                "Dialogue of {} changed meanwhile; keeping the newer state",
                self.chat_id
            );
        }
    }
}

pub async fn handle_incoming(state: &AppState, incoming: Incoming) -> Result<()> {
    match incoming {
        Incoming::Text {
            chat_id,
            user_id,
            text,
        } => handle_text(state, chat_id, user_id, &text).await,
        Incoming::Callback {
            id,
            chat_id,
            user_id,
            data,
        } => handle_callback(state, &id, chat_id, user_id, &data).await,
    }
}

async fn handle_text(state: &AppState, chat_id: i64, user_id: i64, text: &str) -> Result<()> {
    let Some(employee) = access::authorize(state, chat_id, user_id).await? else {
        return Ok(());
    };
    let chat = Chat {
        state,
        chat_id,
        employee,
    };

    if let Some(command) = Command::parse(text, state.bot_username.as_deref()) {
        let interrupted = state.dialogues.clear(chat_id).await;
        tracing::debug!("Command {:?} from {}", command, user_id);
        return run_command(&chat, command, interrupted.is_some()).await;
    }

    if let Some(action) = MenuAction::from_label(text) {
        state.dialogues.clear(chat_id).await;
        return run_menu(&chat, action).await;
    }

    match state.dialogues.get(chat_id).await {
        Some(dialogue) => continue_dialogue(&chat, dialogue, text.trim()).await,
        None => chat.reply(texts::HELP, Keyboard::Keep).await,
    }
}

async fn run_command(chat: &Chat<'_>, command: Command, interrupted: bool) -> Result<()> {
    match command {
        Command::Start => {
            let contacts = &chat.state.config.contacts;
            chat.reply_menu(&texts::greeting(&chat.employee.firstname, contacts))
                .await
        }
        Command::Help | Command::Unknown(_) => chat.reply(texts::HELP, Keyboard::Keep).await,
        Command::Cancel => {
            let text = if interrupted {
                texts::CANCELLED
            } else {
                texts::NOTHING_TO_CANCEL
            };
            chat.reply_menu(text).await
        }
        Command::Users => {
            if access::require_admin(chat.state, chat.chat_id, &chat.employee).await? {
                admin::list_users(chat).await?;
            }
            Ok(())
        }
        Command::AddUser(args) => {
            if !access::require_admin(chat.state, chat.chat_id, &chat.employee).await? {
                return Ok(());
            }
            let step = if args.is_empty() {
                admin::start_add(chat).await?
            } else {
                admin::add_user(chat, &args).await?
            };
            let step = stay_in(step, DialogueState::AwaitingNewEmployee);
            chat.apply(None, step).await;
            Ok(())
        }
        Command::DelUser(args) => {
            if !access::require_admin(chat.state, chat.chat_id, &chat.employee).await? {
                return Ok(());
            }
            let step = if args.is_empty() {
                admin::start_remove(chat).await?
            } else {
                admin::remove_user(chat, &args).await?
            };
            let step = stay_in(step, DialogueState::AwaitingRemoval);
            chat.apply(None, step).await;
            Ok(())
        }
    }
}

/// Inline `/adduser ...` has no dialogue yet; a retryable answer opens one.
fn stay_in(step: Step, state: DialogueState) -> Step {
    match step {
        Step::Stay => Step::Next(state),
        other => other,
    }
}

async fn run_menu(chat: &Chat<'_>, action: MenuAction) -> Result<()> {
    if action.admin_only()
        && !access::require_admin(chat.state, chat.chat_id, &chat.employee).await?
    {
        return Ok(());
    }

    let step = match action {
        MenuAction::Kpi => kpi::start_kpi(chat).await?,
        MenuAction::Plan => kpi::start_plan(chat).await?,
        MenuAction::Input => kpi::start_input(chat).await?,
        MenuAction::Statistics => menu::start_statistics(chat).await?,
        MenuAction::Leader => menu::leaders(chat).await?,
        MenuAction::Bonus => menu::bonus(chat).await?,
        MenuAction::Announcement => admin::start_announcement(chat).await?,
    };
    chat.apply(None, step).await;
    Ok(())
}

async fn continue_dialogue(chat: &Chat<'_>, dialogue: DialogueState, text: &str) -> Result<()> {
    if dialogue.admin_only() && !chat.employee.is_admin {
        chat.state.dialogues.clear(chat.chat_id).await;
        return chat.reply_menu(texts::NO_RIGHTS).await;
    }

    let step = match &dialogue {
        DialogueState::AwaitingKpi { keys } => kpi::answer_kpi(chat, keys, text).await?,
        DialogueState::AwaitingPlan { period } => kpi::answer_plan(chat, *period, text).await?,
        DialogueState::AwaitingInputValue { input } => kpi::answer_input(chat, input, text).await?,
        DialogueState::AwaitingNewEmployee => admin::add_user(chat, text).await?,
        DialogueState::AwaitingRemoval => admin::remove_user(chat, text).await?,
        DialogueState::AwaitingAnnouncement => admin::preview_announcement(chat, text).await?,
        DialogueState::ConfirmingAnnouncement { text: draft } => {
            admin::confirm_announcement(chat, draft, text).await?
        }
        DialogueState::ChoosingPlanPeriod
        | DialogueState::ChoosingInput
        | DialogueState::ChoosingStatistics
        | DialogueState::ChoosingSection
        | DialogueState::ChoosingPeriod { .. } => {
            chat.reply(texts::USE_BUTTONS, Keyboard::Keep).await?;
            Step::Stay
        }
    };
    chat.apply(Some(dialogue), step).await;
    Ok(())
}

async fn handle_callback(
    state: &AppState,
    callback_id: &str,
    chat_id: i64,
    user_id: i64,
    data: &str,
) -> Result<()> {
    let Some(employee) = access::authorize(state, chat_id, user_id).await? else {
        state.messenger.answer_callback(callback_id, None).await?;
        return Ok(());
    };
    let chat = Chat {
        state,
        chat_id,
        employee,
    };

    let current = state.dialogues.get(chat_id).await;
    let callback = Callback::parse(data);
    let accepted = match (&current, &callback) {
        (Some(dialogue), Some(callback)) => {
            dialogue.accepts(callback) && (!dialogue.admin_only() || chat.employee.is_admin)
        }
        _ => false,
    };
    if !accepted {
        tracing::debug!("Stale callback {:?} from {}", data, user_id);
        state
            .messenger
            .answer_callback(callback_id, Some(texts::MENU_EXPIRED))
            .await?;
        return Ok(());
    }
    state.messenger.answer_callback(callback_id, None).await?;

    let step = match (&current, callback) {
        (_, Some(Callback::Plan(period))) => kpi::choose_plan_period(&chat, period).await?,
        (_, Some(Callback::Input(key))) => kpi::choose_input(&chat, &key).await?,
        (_, Some(Callback::Stats(choice))) => menu::choose_statistics(&chat, choice).await?,
        (_, Some(Callback::Section(department))) => {
            menu::choose_section(&chat, &department).await?
        }
        (Some(DialogueState::ChoosingPeriod { department }), Some(Callback::Period(period))) => {
            menu::choose_period(&chat, department, period).await?
        }
        _ => Step::Stay,
    };
    chat.apply(current, step).await;
    Ok(())
}
