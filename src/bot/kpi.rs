//! Number-collecting dialogues: daily KPI, plans and admin inputs.

use super::commands::{period_menu, Callback};
use super::dialogue::DialogueState;
use super::handlers::{Chat, Step};
use super::messenger::Keyboard;
use super::texts;
use crate::config::Period;
use crate::statistics::{due_kpi_items, WriteOutcome};
use anyhow::Result;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerError {
    #[error("Ответ пустой. Отправьте числа через пробел.")]
    Empty,
    #[error("«{0}» не является целым неотрицательным числом.")]
    NotANumber(String),
    #[error("Нужно {expected} чисел через пробел, получено {got}.")]
    WrongCount { expected: usize, got: usize },
}

/// Whitespace-separated non-negative integers, exactly `expected` of them.
pub fn parse_numbers(text: &str, expected: usize) -> Result<Vec<u64>, AnswerError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(AnswerError::Empty);
    }
    let values = tokens
        .iter()
        .map(|token| {
            token
                .chars()
                .all(|c| c.is_ascii_digit())
                .then(|| token.parse::<u64>().ok())
                .flatten()
                .ok_or_else(|| AnswerError::NotANumber(token.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != expected {
        return Err(AnswerError::WrongCount {
            expected,
            got: values.len(),
        });
    }
    Ok(values)
}

pub async fn start_kpi(chat: &Chat<'_>) -> Result<Step> {
    let Some(layout) = chat.state.config.layout(chat.employee.user_id) else {
        chat.reply(texts::NOT_IN_TABLE, Keyboard::Keep).await?;
        return Ok(Step::Done);
    };
    let due = due_kpi_items(layout, chat.state.local_now().weekday);
    if due.is_empty() {
        chat.reply(texts::NO_KPI_TODAY, Keyboard::Keep).await?;
        return Ok(Step::Done);
    }

    let questions: Vec<&str> = due.iter().map(|item| item.question.as_str()).collect();
    chat.reply(
        &texts::numbered_questions(texts::KPI_HEADER, &questions),
        Keyboard::Keep,
    )
    .await?;
    Ok(Step::Next(DialogueState::AwaitingKpi {
        keys: due.iter().map(|item| item.key.clone()).collect(),
    }))
}

pub async fn answer_kpi(chat: &Chat<'_>, keys: &[String], text: &str) -> Result<Step> {
    let values = match parse_numbers(text, keys.len()) {
        Ok(values) => values,
        Err(e) => {
            chat.reply(&e.to_string(), Keyboard::Keep).await?;
            return Ok(Step::Stay);
        }
    };

    chat.reply(texts::WRITING, Keyboard::Keep).await?;
    match chat
        .state
        .statistics()
        .write_kpi(&chat.employee, keys, &values)
        .await
    {
        Ok(WriteOutcome::Written) => chat.reply_menu(texts::KPI_SAVED).await?,
        Ok(WriteOutcome::NotInTable) => chat.reply_menu(texts::NOT_IN_TABLE).await?,
        Err(e) => {
            tracing::error!("Failed to write KPI for {}: {}", chat.employee.user_id, e);
            chat.reply_menu(texts::WRITE_FAILED).await?;
        }
    }
    Ok(Step::Done)
}

pub async fn start_plan(chat: &Chat<'_>) -> Result<Step> {
    let periods: Vec<Period> = chat
        .state
        .config
        .layout(chat.employee.user_id)
        .map(|layout| layout.plans.keys().copied().collect())
        .unwrap_or_default();
    if periods.is_empty() {
        chat.reply(texts::NO_PLANS, Keyboard::Keep).await?;
        return Ok(Step::Done);
    }
    chat.reply(texts::CHOOSE_PLAN_PERIOD, period_menu(periods, true))
        .await?;
    Ok(Step::Next(DialogueState::ChoosingPlanPeriod))
}

pub async fn choose_plan_period(chat: &Chat<'_>, period: Period) -> Result<Step> {
    let Some(plan) = chat
        .state
        .config
        .layout(chat.employee.user_id)
        .and_then(|layout| layout.plans.get(&period))
    else {
        chat.reply(texts::NO_PLANS, Keyboard::Keep).await?;
        return Ok(Step::Done);
    };
    let names: Vec<&str> = plan.items.iter().map(|item| item.name.as_str()).collect();
    chat.reply(
        &texts::numbered_questions(texts::PLAN_HEADER, &names),
        Keyboard::Keep,
    )
    .await?;
    Ok(Step::Next(DialogueState::AwaitingPlan { period }))
}

pub async fn answer_plan(chat: &Chat<'_>, period: Period, text: &str) -> Result<Step> {
    let expected = chat
        .state
        .config
        .layout(chat.employee.user_id)
        .and_then(|layout| layout.plans.get(&period))
        .map(|plan| plan.items.len())
        .unwrap_or_default();
    let values = match parse_numbers(text, expected) {
        Ok(values) => values,
        Err(e) => {
            chat.reply(&e.to_string(), Keyboard::Keep).await?;
            return Ok(Step::Stay);
        }
    };

    chat.reply(texts::WRITING, Keyboard::Keep).await?;
    match chat
        .state
        .statistics()
        .write_plan(&chat.employee, period, &values)
        .await
    {
        Ok(WriteOutcome::Written) => chat.reply_menu(texts::PLAN_SAVED).await?,
        Ok(WriteOutcome::NotInTable) => chat.reply_menu(texts::NO_PLANS).await?,
        Err(e) => {
            tracing::error!("Failed to write plan for {}: {}", chat.employee.user_id, e);
            chat.reply_menu(texts::WRITE_FAILED).await?;
        }
    }
    Ok(Step::Done)
}

pub async fn start_input(chat: &Chat<'_>) -> Result<Step> {
    let inputs = &chat.state.config.inputs;
    if inputs.is_empty() {
        chat.reply(texts::NO_INPUTS, Keyboard::Keep).await?;
        return Ok(Step::Done);
    }
    let buttons = inputs
        .iter()
        .map(|input| Callback::Input(input.key.clone()).button(&input.name));
    chat.reply(texts::CHOOSE_INPUT, Keyboard::inline_column(buttons))
        .await?;
    Ok(Step::Next(DialogueState::ChoosingInput))
}

pub async fn choose_input(chat: &Chat<'_>, key: &str) -> Result<Step> {
    let Some(input) = chat.state.config.input(key) else {
        chat.reply(texts::NO_INPUTS, Keyboard::Keep).await?;
        return Ok(Step::Done);
    };
    chat.reply(&input.question, Keyboard::Keep).await?;
    Ok(Step::Next(DialogueState::AwaitingInputValue {
        input: input.key.clone(),
    }))
}

pub async fn answer_input(chat: &Chat<'_>, key: &str, text: &str) -> Result<Step> {
    let Some(input) = chat.state.config.input(key) else {
        chat.reply_menu(texts::NO_INPUTS).await?;
        return Ok(Step::Done);
    };
    let value = match parse_numbers(text, 1).as_deref() {
        Ok([value]) => *value,
        _ => {
            chat.reply(texts::ONE_NUMBER, Keyboard::Keep).await?;
            return Ok(Step::Stay);
        }
    };

    match chat.state.statistics().write_input(input, value).await {
        Ok(cell) => {
            tracing::info!(
                "Input {} = {} written at {} by {}",
                input.key,
                value,
                cell,
                chat.employee.user_id
            );
            chat.reply_menu(texts::INPUT_SAVED).await?;
        }
        Err(e) => {
            tracing::error!("Failed to write input {}: {}", input.key, e);
            chat.reply_menu(texts::WRITE_FAILED).await?;
        }
    }
    Ok(Step::Done)
}
