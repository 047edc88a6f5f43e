//! Read-only menus: statistics, leaders and bonuses.

use super::commands::{period_menu, statistics_menu, Callback, StatsChoice};
use super::dialogue::DialogueState;
use super::handlers::{Chat, Step};
use super::messenger::Keyboard;
use super::reports;
use super::texts;
use crate::config::Period;
use crate::statistics::StatsError;
use anyhow::Result;

/// Logs a failed sheet read and tells the user; the dialogue ends either way.
async fn sheets_failed(chat: &Chat<'_>, what: &str, e: StatsError) -> Result<Step> {
    tracing::error!("Failed to read {} for {}: {}", what, chat.employee.user_id, e);
    chat.reply_menu(texts::SHEETS_FAILED).await?;
    Ok(Step::Done)
}

pub async fn start_statistics(chat: &Chat<'_>) -> Result<Step> {
    chat.reply(texts::CHOOSE_STATISTICS, statistics_menu()).await?;
    Ok(Step::Next(DialogueState::ChoosingStatistics))
}

pub async fn choose_statistics(chat: &Chat<'_>, choice: StatsChoice) -> Result<Step> {
    let statistics = chat.state.statistics();
    match choice {
        StatsChoice::General => {
            let buttons = chat
                .state
                .config
                .departments
                .iter()
                .map(|(id, department)| Callback::Section(id.clone()).button(&department.name));
            chat.reply(texts::CHOOSE_SECTION, Keyboard::inline_column(buttons))
                .await?;
            Ok(Step::Next(DialogueState::ChoosingSection))
        }
        StatsChoice::KeyValues => match statistics.key_values().await {
            Ok(lines) => {
                chat.reply(&reports::key_values(&lines), Keyboard::Keep).await?;
                Ok(Step::Done)
            }
            Err(e) => sheets_failed(chat, "key values", e).await,
        },
        StatsChoice::Funds => match statistics.funds(chat.employee.is_admin).await {
            Ok(lines) => {
                chat.reply(&reports::funds(&lines), Keyboard::Keep).await?;
                Ok(Step::Done)
            }
            Err(e) => sheets_failed(chat, "funds", e).await,
        },
        StatsChoice::Leader => leaders(chat).await,
        StatsChoice::Back => {
            chat.reply_menu(texts::MAIN_MENU).await?;
            Ok(Step::Done)
        }
    }
}

pub async fn choose_section(chat: &Chat<'_>, department: &str) -> Result<Step> {
    if chat.state.config.department(department).is_none() {
        chat.reply_menu(texts::NO_DATA).await?;
        return Ok(Step::Done);
    }
    chat.reply(
        texts::CHOOSE_PERIOD,
        period_menu([Period::Day, Period::Week], false),
    )
    .await?;
    Ok(Step::Next(DialogueState::ChoosingPeriod {
        department: department.to_string(),
    }))
}

pub async fn choose_period(chat: &Chat<'_>, department: &str, period: Period) -> Result<Step> {
    let statistics = chat.state.statistics();
    let report = match period {
        Period::Day => {
            let employees = chat.state.directory.list().await?;
            statistics.day_report(department, &employees).await
        }
        Period::Week => statistics.week_report(department).await,
    };
    match report {
        Ok(report) => {
            chat.reply(&reports::department(&report, period), Keyboard::Keep)
                .await?;
            Ok(Step::Done)
        }
        Err(e) => sheets_failed(chat, "department report", e).await,
    }
}

pub async fn leaders(chat: &Chat<'_>) -> Result<Step> {
    match chat.state.statistics().all_leaders().await {
        Ok(all) => {
            chat.reply(&reports::leaders(&all), Keyboard::Keep).await?;
            Ok(Step::Done)
        }
        Err(e) => sheets_failed(chat, "leaders", e).await,
    }
}

pub async fn bonus(chat: &Chat<'_>) -> Result<Step> {
    match chat.state.statistics().bonus(&chat.employee).await {
        Ok(Some(value)) => {
            chat.reply(&texts::bonus(&value), Keyboard::Keep).await?;
            Ok(Step::Done)
        }
        Ok(None) => {
            chat.reply(texts::NO_BONUS, Keyboard::Keep).await?;
            Ok(Step::Done)
        }
        Err(e) => sheets_failed(chat, "bonus", e).await,
    }
}
