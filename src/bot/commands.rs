//! Parsing of slash commands, menu buttons and inline callback data.

use super::messenger::Keyboard;
use super::texts;
use crate::config::Period;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: String,
}

/// Splits `/cmd@bot args` into the bare command and its arguments.
pub fn normalize_command(text: &str, bot_name: Option<&str>) -> Option<ParsedCommand> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let mut cmd = parts.next()?.to_lowercase();
    let args = parts.next().unwrap_or("").trim().to_string();

    match bot_name {
        Some(name) => {
            let suffix = format!("@{}", name.to_lowercase());
            if cmd.ends_with(&suffix) {
                cmd.truncate(cmd.len() - suffix.len());
            }
        }
        None => {
            if let Some(at) = cmd.find('@') {
                cmd.truncate(at);
            }
        }
    }

    Some(ParsedCommand { name: cmd, args })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    Users,
    AddUser(String),
    DelUser(String),
    Unknown(String),
}

impl Command {
    pub fn parse(text: &str, bot_name: Option<&str>) -> Option<Self> {
        let parsed = normalize_command(text, bot_name)?;
        Some(match parsed.name.as_str() {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/cancel" => Command::Cancel,
            "/users" => Command::Users,
            "/adduser" => Command::AddUser(parsed.args),
            "/deluser" => Command::DelUser(parsed.args),
            _ => Command::Unknown(parsed.name),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Kpi,
    Plan,
    Statistics,
    Leader,
    Bonus,
    Input,
    Announcement,
}

impl MenuAction {
    pub fn from_label(text: &str) -> Option<Self> {
        match text.trim() {
            texts::BTN_KPI => Some(MenuAction::Kpi),
            texts::BTN_PLAN => Some(MenuAction::Plan),
            texts::BTN_STATISTICS => Some(MenuAction::Statistics),
            texts::BTN_LEADER => Some(MenuAction::Leader),
            texts::BTN_BONUS => Some(MenuAction::Bonus),
            texts::BTN_INPUT => Some(MenuAction::Input),
            texts::BTN_ANNOUNCEMENT => Some(MenuAction::Announcement),
            _ => None,
        }
    }

    pub fn admin_only(&self) -> bool {
        matches!(self, MenuAction::Input | MenuAction::Announcement)
    }
}

pub fn main_menu(is_admin: bool) -> Keyboard {
    let mut rows = vec![
        vec![texts::BTN_KPI.to_string(), texts::BTN_PLAN.to_string()],
        vec![texts::BTN_STATISTICS.to_string(), texts::BTN_LEADER.to_string()],
        vec![texts::BTN_BONUS.to_string()],
    ];
    if is_admin {
        rows.push(vec![
            texts::BTN_INPUT.to_string(),
            texts::BTN_ANNOUNCEMENT.to_string(),
        ]);
    }
    Keyboard::Menu(rows)
}

pub fn confirm_keyboard() -> Keyboard {
    Keyboard::Menu(vec![vec![
        texts::BTN_CONFIRM.to_string(),
        texts::BTN_CANCEL.to_string(),
    ]])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsChoice {
    General,
    KeyValues,
    Funds,
    Leader,
    Back,
}

impl StatsChoice {
    fn as_str(&self) -> &'static str {
        match self {
            StatsChoice::General => "general",
            StatsChoice::KeyValues => "key_values",
            StatsChoice::Funds => "funds",
            StatsChoice::Leader => "leader",
            StatsChoice::Back => "back",
        }
    }
}

/// Inline button payloads; kept short, Telegram caps them at 64 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Plan(Period),
    Stats(StatsChoice),
    Section(String),
    Period(Period),
    Input(String),
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        let (kind, value) = data.split_once(':')?;
        match kind {
            "plan" => Period::parse(value).map(Callback::Plan),
            "stats" => {
                let choice = match value {
                    "general" => StatsChoice::General,
                    "key_values" => StatsChoice::KeyValues,
                    "funds" => StatsChoice::Funds,
                    "leader" => StatsChoice::Leader,
                    "back" => StatsChoice::Back,
                    _ => return None,
                };
                Some(Callback::Stats(choice))
            }
            "section" if !value.is_empty() => Some(Callback::Section(value.to_string())),
            "period" => Period::parse(value).map(Callback::Period),
            "input" if !value.is_empty() => Some(Callback::Input(value.to_string())),
            _ => None,
        }
    }

    pub fn data(&self) -> String {
        match self {
            Callback::Plan(period) => format!("plan:{}", period.as_str()),
            Callback::Stats(choice) => format!("stats:{}", choice.as_str()),
            Callback::Section(department) => format!("section:{department}"),
            Callback::Period(period) => format!("period:{}", period.as_str()),
            Callback::Input(key) => format!("input:{key}"),
        }
    }

    pub fn button(&self, label: impl Into<String>) -> (String, String) {
        (label.into(), self.data())
    }
}

pub fn statistics_menu() -> Keyboard {
    Keyboard::inline_column(vec![
        Callback::Stats(StatsChoice::General).button(texts::BTN_GENERAL),
        Callback::Stats(StatsChoice::KeyValues).button(texts::BTN_KEY_VALUES),
        Callback::Stats(StatsChoice::Funds).button(texts::BTN_FUNDS),
        Callback::Stats(StatsChoice::Leader).button(texts::BTN_LEADER),
        Callback::Stats(StatsChoice::Back).button(texts::BTN_BACK),
    ])
}

pub fn period_menu(periods: impl IntoIterator<Item = Period>, as_plan: bool) -> Keyboard {
    Keyboard::Inline(vec![periods
        .into_iter()
        .map(|period| {
            let callback = if as_plan {
                Callback::Plan(period)
            } else {
                Callback::Period(period)
            };
            callback.button(texts::period_label(period))
        })
        .collect()])
}
