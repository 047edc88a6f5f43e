//! Organization layout: departments, employees' KPI cells, reports and scheduled tasks.
//! Loaded once from JSON at start-up and shared read-only.

use crate::sheets::{address::column_index, CellAddress, CellRange, ReportingCalendar, SheetRef};
use crate::time_utils;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("The configuration file is either not in JSON format or invalid.")]
    InvalidFormat(#[source] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "day" => Some(Period::Day),
            "week" => Some(Period::Week),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrgConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub start_date: NaiveDate,
    /// Who to contact about access, shown in greetings.
    #[serde(default)]
    pub contacts: String,
    pub departments: BTreeMap<String, Department>,
    #[serde(default)]
    pub employees: HashMap<i64, EmployeeLayout>,
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
    #[serde(default)]
    pub key_values: Option<KeyValuesConfig>,
    #[serde(default)]
    pub funds: Option<FundsConfig>,
    #[serde(default)]
    pub bonuses: Option<SheetRef>,
    /// Empty means every employee in the directory.
    #[serde(default)]
    pub report_recipients: Vec<i64>,
    #[serde(default)]
    pub tasks: Vec<ScheduledTask>,
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Department {
    pub name: String,
    pub sheet: SheetRef,
    pub positions: BTreeMap<String, Position>,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub plan_sheet: Option<SheetRef>,
}

impl Department {
    /// Sheet holding plan cells; the KPI sheet unless a separate one is configured.
    pub fn plan_sheet(&self) -> &SheetRef {
        self.plan_sheet.as_ref().unwrap_or(&self.sheet)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub name: String,
    /// Whether the bot chases this position's KPI.
    #[serde(default)]
    pub tracked: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub day: Vec<StatColumn>,
    #[serde(default)]
    pub week: Vec<StatColumn>,
    /// Daily points per leader candidate.
    #[serde(default)]
    pub leaders: Vec<StatColumn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatColumn {
    pub name: String,
    pub column: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeLayout {
    #[serde(default)]
    pub kpi: Vec<KpiItem>,
    #[serde(default)]
    pub plans: BTreeMap<Period, PlanLayout>,
    #[serde(default)]
    pub bonus_column: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KpiItem {
    pub key: String,
    pub name: String,
    pub question: String,
    pub column: String,
    /// Weekdays the item is asked, 0 = Monday.
    #[serde(default = "every_day")]
    pub schedule: Vec<u8>,
}

fn every_day() -> Vec<u8> {
    (0..7).collect()
}

fn working_days() -> Vec<u8> {
    (0..5).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanLayout {
    /// Current plan cells, in the order values are asked.
    pub items: Vec<PlanItem>,
    #[serde(default)]
    pub fact: Vec<String>,
    /// Anchors the rotated plan/fact block is copied to, one per block row.
    #[serde(default)]
    pub previous: Vec<String>,
}

impl PlanLayout {
    /// From the first plan cell to the last fact cell (or last plan cell without facts).
    pub fn block(&self) -> Option<CellRange> {
        let first = self.items.first()?.cell.parse().ok()?;
        let last = match self.fact.last() {
            Some(cell) => cell,
            None => &self.items.last()?.cell,
        };
        Some(CellRange::new(first, last.parse().ok()?))
    }

    pub fn block_height(&self) -> Option<usize> {
        self.block().map(|block| block.height())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanItem {
    pub name: String,
    pub cell: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub key: String,
    pub name: String,
    pub question: String,
    pub department: String,
    pub column: String,
    #[serde(default = "default_input_period")]
    pub period: Period,
    #[serde(default)]
    pub reminder: Option<String>,
    #[serde(default)]
    pub recipients: Vec<i64>,
}

fn default_input_period() -> Period {
    Period::Week
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyValuesConfig {
    pub sheet: SheetRef,
    pub items: Vec<KeyValueItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyValueItem {
    pub name: String,
    pub periods: Vec<KeyValuePeriod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyValuePeriod {
    pub name: String,
    pub actual: String,
    #[serde(default)]
    pub planned: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundsConfig {
    pub sheet: SheetRef,
    pub items: Vec<Fund>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fund {
    pub name: String,
    pub actual: String,
    pub planned: String,
    #[serde(default)]
    pub admin_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledTask {
    /// Local `HH:MM`.
    pub time: String,
    #[serde(default = "working_days")]
    pub days: Vec<u8>,
    #[serde(flatten)]
    pub action: TaskAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskAction {
    KpiReminder {
        #[serde(default)]
        second: bool,
    },
    PlanReminder {
        period: Period,
        #[serde(default)]
        second: bool,
    },
    DayReport,
    WeekReport,
    InputReminder {
        input: String,
    },
    RotatePlans {
        department: String,
        period: Period,
    },
}

impl TaskAction {
    /// Stable name used to record that the task ran on a date.
    pub fn key(&self) -> String {
        match self {
            TaskAction::KpiReminder { second } => format!("kpi_reminder:{}", stage(*second)),
            TaskAction::PlanReminder { period, second } => {
                format!("plan_reminder:{}:{}", period.as_str(), stage(*second))
            }
            TaskAction::DayReport => "day_report".to_string(),
            TaskAction::WeekReport => "week_report".to_string(),
            TaskAction::InputReminder { input } => format!("input_reminder:{input}"),
            TaskAction::RotatePlans { department, period } => {
                format!("rotate_plans:{department}:{}", period.as_str())
            }
        }
    }
}

fn stage(second: bool) -> &'static str {
    if second {
        "second"
    } else {
        "first"
    }
}

impl OrgConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: OrgConfig = serde_json::from_str(raw).map_err(ConfigError::InvalidFormat)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !time_utils::is_valid_timezone(&self.timezone) {
            return invalid(format!("unknown timezone {}", self.timezone));
        }

        for (id, department) in &self.departments {
            check_callback_id(id, "department")?;
            let summary = &department.summary;
            for column in summary.day.iter().chain(&summary.week).chain(&summary.leaders) {
                check_column(&column.column, &format!("department {id}"))?;
            }
        }

        for (user_id, layout) in &self.employees {
            let context = format!("employee {user_id}");
            let mut keys = HashSet::new();
            for item in &layout.kpi {
                check_column(&item.column, &context)?;
                check_days(&item.schedule, &context)?;
                if !keys.insert(item.key.as_str()) {
                    return invalid(format!("{context}: duplicate KPI key {}", item.key));
                }
            }
            for plan in layout.plans.values() {
                let cells = plan
                    .items
                    .iter()
                    .map(|item| &item.cell)
                    .chain(&plan.fact)
                    .chain(&plan.previous);
                for cell in cells {
                    check_cell(cell, &context)?;
                }
                if let Some(height) = plan.block_height() {
                    if plan.previous.len() != height {
                        return invalid(format!(
                            "{context}: plan block has {height} rows but {} previous anchors",
                            plan.previous.len()
                        ));
                    }
                }
            }
            if let Some(column) = &layout.bonus_column {
                check_column(column, &context)?;
            }
        }

        let mut input_keys = HashSet::new();
        for input in &self.inputs {
            let context = format!("input {}", input.key);
            check_callback_id(&input.key, "input")?;
            if !self.departments.contains_key(&input.department) {
                return invalid(format!("{context}: unknown department {}", input.department));
            }
            check_column(&input.column, &context)?;
            if !input_keys.insert(input.key.as_str()) {
                return invalid(format!("duplicate input key {}", input.key));
            }
        }

        if let Some(key_values) = &self.key_values {
            for item in &key_values.items {
                for period in &item.periods {
                    check_cell(&period.actual, "key values")?;
                    if let Some(planned) = &period.planned {
                        check_cell(planned, "key values")?;
                    }
                }
            }
        }

        if let Some(funds) = &self.funds {
            for fund in &funds.items {
                check_cell(&fund.actual, "funds")?;
                check_cell(&fund.planned, "funds")?;
            }
        }

        for task in &self.tasks {
            let context = format!("task {}", task.action.key());
            if time_utils::parse_clock_time(&task.time).is_none() {
                return invalid(format!("{context}: bad time {}", task.time));
            }
            check_days(&task.days, &context)?;
            match &task.action {
                TaskAction::InputReminder { input } if self.input(input).is_none() => {
                    return invalid(format!("{context}: unknown input"));
                }
                TaskAction::RotatePlans { department, .. }
                    if !self.departments.contains_key(department) =>
                {
                    return invalid(format!("{context}: unknown department"));
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn calendar(&self) -> ReportingCalendar {
        ReportingCalendar::new(self.start_date)
    }

    pub fn department(&self, id: &str) -> Option<&Department> {
        self.departments.get(id)
    }

    pub fn layout(&self, user_id: i64) -> Option<&EmployeeLayout> {
        self.employees.get(&user_id)
    }

    pub fn input(&self, key: &str) -> Option<&InputConfig> {
        self.inputs.iter().find(|input| input.key == key)
    }

    pub fn knows_position(&self, department: &str, position: &str) -> bool {
        self.departments
            .get(department)
            .map(|d| d.positions.contains_key(position))
            .unwrap_or(false)
    }

    pub fn is_tracked(&self, department: &str, position: &str) -> bool {
        self.departments
            .get(department)
            .and_then(|d| d.positions.get(position))
            .map(|p| p.tracked)
            .unwrap_or(false)
    }

    /// Departments where at least one position is tracked.
    pub fn tracked_departments(&self) -> impl Iterator<Item = (&String, &Department)> {
        self.departments
            .iter()
            .filter(|(_, d)| d.positions.values().any(|p| p.tracked))
    }
}

fn invalid<T>(message: String) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid(message))
}

fn check_column(column: &str, context: &str) -> Result<(), ConfigError> {
    column_index(column.trim())
        .map(|_| ())
        .ok_or_else(|| ConfigError::Invalid(format!("{context}: bad column {column}")))
}

fn check_cell(cell: &str, context: &str) -> Result<(), ConfigError> {
    cell.parse::<CellAddress>()
        .map(|_| ())
        .map_err(|_| ConfigError::Invalid(format!("{context}: bad cell {cell}")))
}

/// Ids travel in callback data, which Telegram caps at 64 bytes including the action prefix.
const MAX_CALLBACK_ID: usize = 56;

fn check_callback_id(id: &str, kind: &str) -> Result<(), ConfigError> {
    if id.len() > MAX_CALLBACK_ID {
        return invalid(format!("{kind} id {id} is longer than {MAX_CALLBACK_ID} bytes"));
    }
    Ok(())
}

fn check_days(days: &[u8], context: &str) -> Result<(), ConfigError> {
    match days.iter().find(|d| **d > 6) {
        Some(day) => invalid(format!("{context}: weekday {day} is outside 0..=6")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SAMPLE_CONFIG;

    #[test]
    fn shipped_example_is_valid() {
        let config = OrgConfig::from_json(include_str!("../config.example.json")).unwrap();
        assert_eq!(config.tasks.len(), 7);
        assert_eq!(config.tracked_departments().count(), 2);
    }

    #[test]
    fn sample_config_loads() {
        let config = OrgConfig::from_json(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.timezone, "Europe/Moscow");
        assert_eq!(config.departments.len(), 2);
        assert!(config.knows_position("law", "lawyer"));
        assert!(!config.knows_position("law", "seller"));
        assert!(config.is_tracked("law", "lawyer"));
        assert!(!config.is_tracked("law", "assistant"));
        assert_eq!(
            config.tracked_departments().map(|(id, _)| id.as_str()).collect::<Vec<_>>(),
            vec!["law"]
        );
        let layout = config.layout(100).unwrap();
        assert_eq!(layout.kpi.len(), 2);
        assert!(layout.plans.contains_key(&Period::Day));
        assert_eq!(config.input("lawsuits").unwrap().period, Period::Week);
    }

    #[test]
    fn tasks_deserialize_with_flattened_action() {
        let config = OrgConfig::from_json(SAMPLE_CONFIG).unwrap();
        let actions: Vec<String> = config.tasks.iter().map(|t| t.action.key()).collect();
        assert!(actions.contains(&"kpi_reminder:first".to_string()));
        assert!(actions.contains(&"kpi_reminder:second".to_string()));
        assert!(actions.contains(&"rotate_plans:law:day".to_string()));
        let report = config
            .tasks
            .iter()
            .find(|t| t.action == TaskAction::DayReport)
            .unwrap();
        assert_eq!(report.days, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn invalid_json_reports_format_error() {
        let err = OrgConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat(_)));
        assert_eq!(
            err.to_string(),
            "The configuration file is either not in JSON format or invalid."
        );
    }

    #[test]
    fn validation_catches_bad_references() {
        let base: serde_json::Value = serde_json::from_str(SAMPLE_CONFIG).unwrap();

        let mut bad_tz = base.clone();
        bad_tz["timezone"] = "Nowhere/City".into();
        assert!(OrgConfig::from_json(&bad_tz.to_string()).is_err());

        let mut bad_column = base.clone();
        bad_column["employees"]["100"]["kpi"][0]["column"] = "1A".into();
        assert!(OrgConfig::from_json(&bad_column.to_string()).is_err());

        let mut bad_day = base.clone();
        bad_day["employees"]["100"]["kpi"][0]["schedule"] = serde_json::json!([7]);
        assert!(OrgConfig::from_json(&bad_day.to_string()).is_err());

        let mut bad_input = base.clone();
        bad_input["inputs"][0]["department"] = "nowhere".into();
        assert!(OrgConfig::from_json(&bad_input.to_string()).is_err());

        let mut bad_time = base.clone();
        bad_time["tasks"][0]["time"] = "25:00".into();
        assert!(OrgConfig::from_json(&bad_time.to_string()).is_err());

        let mut no_anchors = base.clone();
        no_anchors["employees"]["100"]["plans"]["day"]["previous"] = serde_json::json!([]);
        let err = OrgConfig::from_json(&no_anchors.to_string()).unwrap_err();
        assert!(err.to_string().contains("previous anchors"));

        let mut short_anchors = base.clone();
        short_anchors["employees"]["100"]["plans"]["day"]["previous"] = serde_json::json!(["E2"]);
        assert!(OrgConfig::from_json(&short_anchors.to_string()).is_err());

        let mut long_input = base.clone();
        long_input["inputs"][0]["key"] = "x".repeat(57).into();
        let err = OrgConfig::from_json(&long_input.to_string()).unwrap_err();
        assert!(err.to_string().contains("longer than 56 bytes"));

        let mut long_department = base.clone();
        let law = long_department["departments"]["law"].clone();
        long_department["departments"]["д".repeat(29)] = law;
        assert!(OrgConfig::from_json(&long_department.to_string()).is_err());

        let mut dup_key = base;
        dup_key["employees"]["100"]["kpi"][1]["key"] = "hearings".into();
        let err = OrgConfig::from_json(&dup_key.to_string()).unwrap_err();
        assert!(err.to_string().contains("duplicate KPI key"));
    }
}
