//! Scheduled reminders, reports and plan rotation.

use crate::bot::messenger::{broadcast, Keyboard};
use crate::bot::{reports, texts};
use crate::config::{Period, ScheduledTask, TaskAction};
use crate::db::Employee;
use crate::state::AppState;
use crate::time_utils::{parse_clock_time, LocalMoment};
use anyhow::{Context, Result};

pub fn is_due(task: &ScheduledTask, now: &LocalMoment) -> bool {
    task.days.contains(&now.weekday)
        && parse_clock_time(&task.time) == Some((now.hour, now.minute))
}

/// Ledger key; the time is part of it so equal actions at different times both run.
fn run_key(task: &ScheduledTask) -> String {
    format!("{}@{}", task.action.key(), task.time)
}

/// Runs every task due at `now` that has not run today yet. Returns how many ran.
pub async fn run_due_tasks(state: &AppState, now: &LocalMoment) -> usize {
    let mut executed = 0;
    for task in state.config.tasks.iter().filter(|task| is_due(task, now)) {
        let key = run_key(task);
        match state.ledger.claim_run(&key, now.date).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Task {} already ran on {}", key, now.date);
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to claim task {}: {:#}", key, e);
                continue;
            }
        }

        tracing::info!("Running scheduled task {}", key);
        if let Err(e) = run_task(state, &task.action).await {
            tracing::error!("Scheduled task {} failed: {:#}", key, e);
        }
        executed += 1;
    }
    executed
}

pub async fn run_task(state: &AppState, action: &TaskAction) -> Result<()> {
    match action {
        TaskAction::KpiReminder { second } => kpi_reminder(state, *second).await,
        TaskAction::PlanReminder { period, second } => plan_reminder(state, *period, *second).await,
        TaskAction::DayReport => day_report(state).await,
        TaskAction::WeekReport => week_report(state).await,
        TaskAction::InputReminder { input } => input_reminder(state, input).await,
        TaskAction::RotatePlans { department, period } => {
            let employees = state.directory.list().await?;
            state
                .statistics()
                .rotate_plans(department, *period, &employees)
                .await?;
            Ok(())
        }
    }
}

async fn kpi_reminder(state: &AppState, second: bool) -> Result<()> {
    let employees = state.directory.list().await?;
    let statistics = state.statistics();
    let mut missing = Vec::new();
    for (id, _) in state.config.tracked_departments() {
        missing.extend(statistics.missing_kpi(id, &employees).await?);
    }

    let text = if second {
        texts::KPI_REMINDER_SECOND
    } else {
        texts::KPI_REMINDER
    };
    let (sent, failed) = broadcast(state.messenger.as_ref(), &missing, text, Keyboard::Keep).await;
    tracing::info!("KPI reminders: {} sent, {} failed", sent, failed);
    Ok(())
}

async fn plan_reminder(state: &AppState, period: Period, second: bool) -> Result<()> {
    let employees = state.directory.list().await?;
    let missing = state.statistics().missing_plan(period, &employees).await?;

    let text = if second {
        texts::PLAN_REMINDER_SECOND
    } else {
        texts::PLAN_REMINDER
    };
    let (sent, failed) = broadcast(state.messenger.as_ref(), &missing, text, Keyboard::Keep).await;
    tracing::info!(
        "Plan reminders ({}): {} sent, {} failed",
        period.as_str(),
        sent,
        failed
    );
    Ok(())
}

/// Configured report recipients, or every employee when none are configured.
fn report_recipients(state: &AppState, employees: &[Employee]) -> Vec<i64> {
    if state.config.report_recipients.is_empty() {
        employees.iter().map(|e| e.user_id).collect()
    } else {
        state.config.report_recipients.clone()
    }
}

async fn day_report(state: &AppState) -> Result<()> {
    let employees = state.directory.list().await?;
    let statistics = state.statistics();

    let mut sections = Vec::new();
    for id in state.config.departments.keys() {
        let report = statistics.day_report(id, &employees).await?;
        sections.push(reports::department(&report, Period::Day));
    }
    if state.config.key_values.is_some() {
        sections.push(reports::key_values(&statistics.key_values().await?));
    }
    let leaders = reports::leaders(&statistics.all_leaders().await?);

    let (admins, others): (Vec<i64>, Vec<i64>) = report_recipients(state, &employees)
        .into_iter()
        .partition(|id| employees.iter().any(|e| e.user_id == *id && e.is_admin));

    for (recipients, full) in [(admins, true), (others, false)] {
        if recipients.is_empty() {
            continue;
        }
        let mut parts = sections.clone();
        if state.config.funds.is_some() {
            parts.push(reports::funds(&statistics.funds(full).await?));
        }
        parts.push(leaders.clone());
        let text = parts.join("\n\n");
        let (sent, failed) =
            broadcast(state.messenger.as_ref(), &recipients, &text, Keyboard::Keep).await;
        tracing::info!("Day report (full funds: {}): {} sent, {} failed", full, sent, failed);
    }
    Ok(())
}

async fn week_report(state: &AppState) -> Result<()> {
    let employees = state.directory.list().await?;
    let statistics = state.statistics();

    let mut sections = Vec::new();
    for (id, _) in state.config.tracked_departments() {
        let report = statistics.week_report(id).await?;
        sections.push(reports::department(&report, Period::Week));
    }
    if sections.is_empty() {
        return Ok(());
    }

    let recipients = report_recipients(state, &employees);
    let (sent, failed) = broadcast(
        state.messenger.as_ref(),
        &recipients,
        &sections.join("\n\n"),
        Keyboard::Keep,
    )
    .await;
    tracing::info!("Week report: {} sent, {} failed", sent, failed);
    Ok(())
}

async fn input_reminder(state: &AppState, key: &str) -> Result<()> {
    let input = state
        .config
        .input(key)
        .with_context(|| format!("unknown input {key}"))?;
    let text = input.reminder.as_deref().unwrap_or(&input.question);

    let known = state.directory.ids().await?;
    let recipients: Vec<i64> = input
        .recipients
        .iter()
        .copied()
        .filter(|id| {
            let exists = known.contains(id);
            if !exists {
                tracing::warn!("Input {} recipient {} is not an employee", key, id);
            }
            exists
        })
        .collect();

    let (sent, failed) = broadcast(state.messenger.as_ref(), &recipients, text, Keyboard::Keep).await;
    tracing::info!("Input reminder {}: {} sent, {} failed", key, sent, failed);
    Ok(())
}
