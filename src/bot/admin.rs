//! Directory management and announcements, admins only.

use super::commands::confirm_keyboard;
use super::dialogue::DialogueState;
use super::handlers::{Chat, Step};
use super::messenger::{broadcast, Keyboard};
use super::texts;
use crate::config::OrgConfig;
use crate::db::{Employee, NewEmployee};
use anyhow::Result;

/// Telegram rejects messages longer than 4096 characters.
const MESSAGE_LIMIT: usize = 4000;

#[derive(Debug, PartialEq, Eq)]
pub enum NewEmployeeError {
    Format,
    UnknownPosition,
}

/// `<id> <username> <first> <last> <department> <position> <да|нет>`
pub fn parse_new_employee(line: &str, config: &OrgConfig) -> Result<NewEmployee, NewEmployeeError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [id, username, firstname, lastname, department, position, admin] = fields.as_slice() else {
        return Err(NewEmployeeError::Format);
    };
    let user_id: i64 = id.parse().map_err(|_| NewEmployeeError::Format)?;
    let is_admin = match admin.to_lowercase().as_str() {
        "да" => true,
        "нет" => false,
        _ => return Err(NewEmployeeError::Format),
    };
    if !config.knows_position(department, position) {
        return Err(NewEmployeeError::UnknownPosition);
    }
    Ok(NewEmployee {
        user_id,
        username: username.trim_start_matches('@').to_string(),
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
        department: department.to_string(),
        position: position.to_string(),
        is_admin,
    })
}

fn known_positions(config: &OrgConfig) -> String {
    config
        .departments
        .iter()
        .map(|(id, department)| {
            let positions: Vec<&str> = department.positions.keys().map(String::as_str).collect();
            format!("{id}: {}", positions.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn user_line(index: usize, employee: &Employee) -> String {
    let mut line = format!(
        "{}: {} {} - {} {} [{} / {}]",
        index,
        employee.user_id,
        employee.username,
        employee.firstname,
        employee.lastname,
        employee.department,
        employee.position
    );
    if employee.is_admin {
        line.push_str(" (admin)");
    }
    line
}

/// Joins lines into as few messages as fit the Telegram limit.
fn paginate(lines: &[String]) -> Vec<String> {
    let mut pages = Vec::new();
    let mut page = String::new();
    for line in lines {
        if !page.is_empty() && page.chars().count() + line.chars().count() + 1 > MESSAGE_LIMIT {
            pages.push(std::mem::take(&mut page));
        }
        if !page.is_empty() {
            page.push('\n');
        }
        page.push_str(line);
    }
    if !page.is_empty() {
        pages.push(page);
    }
    pages
}

pub async fn list_users(chat: &Chat<'_>) -> Result<()> {
    let employees = chat.state.directory.list().await?;
    if employees.is_empty() {
        return chat.reply(texts::NO_USERS, Keyboard::Keep).await;
    }
    let lines: Vec<String> = employees
        .iter()
        .enumerate()
        .map(|(i, employee)| user_line(i + 1, employee))
        .collect();
    for page in paginate(&lines) {
        chat.reply(&page, Keyboard::Keep).await?;
    }
    Ok(())
}

pub async fn start_add(chat: &Chat<'_>) -> Result<Step> {
    chat.reply(texts::ADD_USER_PROMPT, Keyboard::Keep).await?;
    Ok(Step::Next(DialogueState::AwaitingNewEmployee))
}

pub async fn add_user(chat: &Chat<'_>, line: &str) -> Result<Step> {
    let config = &chat.state.config;
    let new = match parse_new_employee(line, config) {
        Ok(new) => new,
        Err(NewEmployeeError::Format) => {
            chat.reply(texts::ADD_USER_FORMAT, Keyboard::Keep).await?;
            return Ok(Step::Stay);
        }
        Err(NewEmployeeError::UnknownPosition) => {
            chat.reply(&texts::unknown_position(&known_positions(config)), Keyboard::Keep)
                .await?;
            return Ok(Step::Stay);
        }
    };

    let user_id = new.user_id;
    if chat.state.directory.add(new).await? {
        tracing::info!("Employee {} added by {}", user_id, chat.employee.user_id);
        chat.reply_menu(texts::USER_ADDED).await?;
    } else {
        chat.reply_menu(texts::USER_EXISTS).await?;
    }
    Ok(Step::Done)
}

pub async fn start_remove(chat: &Chat<'_>) -> Result<Step> {
    chat.reply(texts::DEL_USER_PROMPT, Keyboard::Keep).await?;
    Ok(Step::Next(DialogueState::AwaitingRemoval))
}

pub async fn remove_user(chat: &Chat<'_>, text: &str) -> Result<Step> {
    let Ok(user_id) = text.trim().parse::<i64>() else {
        chat.reply(texts::ID_NOT_NUMBER, Keyboard::Keep).await?;
        return Ok(Step::Stay);
    };

    if chat.state.directory.remove(user_id).await? {
        chat.state.dialogues.clear(user_id).await;
        tracing::info!("Employee {} removed by {}", user_id, chat.employee.user_id);
        chat.reply_menu(texts::USER_REMOVED).await?;
    } else {
        chat.reply_menu(texts::USER_NOT_FOUND).await?;
    }
    Ok(Step::Done)
}

pub async fn start_announcement(chat: &Chat<'_>) -> Result<Step> {
    chat.reply(texts::ANNOUNCEMENT_PROMPT, Keyboard::Remove).await?;
    Ok(Step::Next(DialogueState::AwaitingAnnouncement))
}

pub async fn preview_announcement(chat: &Chat<'_>, text: &str) -> Result<Step> {
    let draft = texts::announcement(&chat.employee.full_name(), text);
    chat.reply(&draft, Keyboard::Keep).await?;
    chat.reply(texts::ANNOUNCEMENT_PREVIEW, confirm_keyboard())
        .await?;
    Ok(Step::Next(DialogueState::ConfirmingAnnouncement { text: draft }))
}

pub async fn confirm_announcement(chat: &Chat<'_>, draft: &str, answer: &str) -> Result<Step> {
    match answer {
        texts::BTN_CONFIRM => {
            let recipients = chat.state.directory.ids().await?;
            let (sent, failed) = broadcast(
                chat.state.messenger.as_ref(),
                &recipients,
                draft,
                Keyboard::Keep,
            )
            .await;
            tracing::info!(
                "Announcement from {} delivered: {} sent, {} failed",
                chat.employee.user_id,
                sent,
                failed
            );
            chat.reply_menu(&texts::announcement_sent(sent, failed)).await?;
            Ok(Step::Done)
        }
        texts::BTN_CANCEL => {
            chat.reply_menu(texts::ANNOUNCEMENT_CANCELLED).await?;
            Ok(Step::Done)
        }
        _ => {
            chat.reply(texts::CHOOSE_ACTION, confirm_keyboard()).await?;
            Ok(Step::Stay)
        }
    }
}
