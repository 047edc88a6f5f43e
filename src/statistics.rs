//! Spreadsheet-backed KPI bookkeeping: writes, reports, reminder lookups and plan rotation.

use crate::config::{Department, EmployeeLayout, InputConfig, KpiItem, OrgConfig, Period, StatColumn};
use crate::db::Employee;
use crate::sheets::{CellAddress, CellRange, SheetRef, SheetsError, SpreadsheetClient};
use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error("unknown department {0}")]
    UnknownDepartment(String),
    #[error("expected {expected} values, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The employee has no cells configured for this.
    NotInTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentReport {
    pub department: String,
    pub totals: Vec<(String, String)>,
    pub people: Vec<PersonLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonLine {
    pub name: String,
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaders {
    pub department: String,
    pub names: Vec<String>,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueLine {
    pub name: String,
    pub periods: Vec<KeyValuePoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValuePoint {
    pub name: String,
    pub actual: String,
    pub planned: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FundLine {
    pub name: String,
    pub actual: String,
    pub planned: String,
}

/// KPI items asked on `weekday` (0 = Monday), in configured order.
pub fn due_kpi_items(layout: &EmployeeLayout, weekday: u8) -> Vec<&KpiItem> {
    layout
        .kpi
        .iter()
        .filter(|item| item.schedule.contains(&weekday))
        .collect()
}

/// Cell text as shown to people: without non-breaking spaces.
pub fn display(value: &str) -> String {
    value.replace('\u{a0}', "").trim().to_string()
}

fn points(name: &str, raw: &str) -> f64 {
    let cleaned: String = display(raw)
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse().unwrap_or_else(|_| {
        tracing::warn!("Leader points for {} are not a number: {:?}", name, raw);
        0.0
    })
}

fn column(letters: &str) -> Result<u32, SheetsError> {
    Ok(CellAddress::at(letters, 1)?.column)
}

fn blank_to_zero(value: String) -> String {
    if display(&value).is_empty() {
        "0".to_string()
    } else {
        value
    }
}

pub struct Statistics<'a> {
    config: &'a OrgConfig,
    sheets: &'a dyn SpreadsheetClient,
    today: NaiveDate,
}

impl<'a> Statistics<'a> {
    pub fn new(config: &'a OrgConfig, sheets: &'a dyn SpreadsheetClient, today: NaiveDate) -> Self {
        Self {
            config,
            sheets,
            today,
        }
    }

    fn weekday(&self) -> u8 {
        self.today.weekday().num_days_from_monday() as u8
    }

    fn department(&self, id: &str) -> Result<&'a Department, StatsError> {
        self.config
            .department(id)
            .ok_or_else(|| StatsError::UnknownDepartment(id.to_string()))
    }

    fn day_row(&self, sheet: &SheetRef) -> Result<u32, SheetsError> {
        self.config.calendar().day_row(sheet.start_row, self.today)
    }

    fn week_row(&self, sheet: &SheetRef) -> Result<u32, SheetsError> {
        self.config.calendar().week_row(sheet.start_row, self.today)
    }

    async fn read_named(
        &self,
        sheet: &SheetRef,
        columns: &[StatColumn],
        row: u32,
    ) -> Result<Vec<(String, String)>, SheetsError> {
        let indexes = columns
            .iter()
            .map(|c| column(&c.column))
            .collect::<Result<Vec<_>, _>>()?;
        let values = self.sheets.read_row(sheet, &indexes, row).await?;
        Ok(columns
            .iter()
            .zip(values)
            .map(|(c, v)| (c.name.clone(), display(&v)))
            .collect())
    }

    /// Reads scattered cells of one sheet in a single request.
    async fn read_cells(
        &self,
        sheet: &SheetRef,
        cells: &[CellAddress],
    ) -> Result<Vec<String>, SheetsError> {
        let ranges: Vec<CellRange> = cells.iter().copied().map(CellRange::single).collect();
        let blocks = self.sheets.read_ranges(sheet, &ranges).await?;
        Ok(blocks
            .into_iter()
            .map(|block| {
                block
                    .into_iter()
                    .next()
                    .and_then(|row| row.into_iter().next())
                    .unwrap_or_default()
            })
            .collect())
    }

    fn members<'e>(
        &self,
        department: &str,
        employees: &'e [Employee],
    ) -> Vec<(&'e Employee, &'a EmployeeLayout)> {
        employees
            .iter()
            .filter(|e| e.department == department)
            .filter_map(|e| self.config.layout(e.user_id).map(|layout| (e, layout)))
            .collect()
    }

    /// Writes answers for `keys` to the employee's columns at today's row.
    pub async fn write_kpi(
        &self,
        employee: &Employee,
        keys: &[String],
        values: &[u64],
    ) -> Result<WriteOutcome, StatsError> {
        let (Some(department), Some(layout)) = (
            self.config.department(&employee.department),
            self.config.layout(employee.user_id),
        ) else {
            return Ok(WriteOutcome::NotInTable);
        };
        if keys.len() != values.len() {
            return Err(StatsError::CountMismatch {
                expected: keys.len(),
                got: values.len(),
            });
        }

        let row = self.day_row(&department.sheet)?;
        let mut cells = Vec::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            let Some(item) = layout.kpi.iter().find(|item| &item.key == key) else {
                return Ok(WriteOutcome::NotInTable);
            };
            cells.push((CellAddress::at(&item.column, row)?, value.to_string()));
        }

        self.sheets.write_cells(&department.sheet, &cells).await?;
        tracing::info!(user_id = employee.user_id, row, count = cells.len(), "KPI written");
        Ok(WriteOutcome::Written)
    }

    pub async fn write_input(
        &self,
        input: &InputConfig,
        value: u64,
    ) -> Result<CellAddress, StatsError> {
        let department = self.department(&input.department)?;
        let row = match input.period {
            Period::Day => self.day_row(&department.sheet)?,
            Period::Week => self.week_row(&department.sheet)?,
        };
        let cell = CellAddress::at(&input.column, row)?;
        self.sheets
            .write_cells(&department.sheet, &[(cell, value.to_string())])
            .await?;
        tracing::info!(input = %input.key, %cell, "Input written");
        Ok(cell)
    }

    pub async fn write_plan(
        &self,
        employee: &Employee,
        period: Period,
        values: &[u64],
    ) -> Result<WriteOutcome, StatsError> {
        let (Some(department), Some(plan)) = (
            self.config.department(&employee.department),
            self.config
                .layout(employee.user_id)
                .and_then(|layout| layout.plans.get(&period)),
        ) else {
            return Ok(WriteOutcome::NotInTable);
        };
        if plan.items.len() != values.len() {
            return Err(StatsError::CountMismatch {
                expected: plan.items.len(),
                got: values.len(),
            });
        }

        let cells = plan
            .items
            .iter()
            .zip(values)
            .map(|(item, value)| Ok((item.cell.parse::<CellAddress>()?, value.to_string())))
            .collect::<Result<Vec<_>, SheetsError>>()?;
        self.sheets.write_cells(department.plan_sheet(), &cells).await?;
        tracing::info!(user_id = employee.user_id, period = period.as_str(), "Plan written");
        Ok(WriteOutcome::Written)
    }

    /// Department totals plus every member's KPI values at today's row.
    pub async fn day_report(
        &self,
        department_id: &str,
        employees: &[Employee],
    ) -> Result<DepartmentReport, StatsError> {
        let department = self.department(department_id)?;
        let row = self.day_row(&department.sheet)?;
        let totals = self
            .read_named(&department.sheet, &department.summary.day, row)
            .await?;

        let members: Vec<_> = self
            .members(department_id, employees)
            .into_iter()
            .filter(|(_, layout)| !layout.kpi.is_empty())
            .collect();
        let people = try_join_all(members.into_iter().map(|(employee, layout)| async move {
            let columns = layout
                .kpi
                .iter()
                .map(|item| column(&item.column))
                .collect::<Result<Vec<_>, _>>()?;
            let values = self.sheets.read_row(&department.sheet, &columns, row).await?;
            Ok::<_, SheetsError>(PersonLine {
                name: employee.full_name(),
                values: layout
                    .kpi
                    .iter()
                    .zip(values)
                    .map(|(item, v)| (item.name.clone(), display(&v)))
                    .collect(),
            })
        }))
        .await?;

        Ok(DepartmentReport {
            department: department.name.clone(),
            totals,
            people,
        })
    }

    pub async fn week_report(&self, department_id: &str) -> Result<DepartmentReport, StatsError> {
        let department = self.department(department_id)?;
        let row = self.week_row(&department.sheet)?;
        let totals = self
            .read_named(&department.sheet, &department.summary.week, row)
            .await?;
        Ok(DepartmentReport {
            department: department.name.clone(),
            totals,
            people: Vec::new(),
        })
    }

    /// Everyone sharing the top score today; nobody when the top score is zero.
    pub async fn leaders(&self, department_id: &str) -> Result<Leaders, StatsError> {
        let department = self.department(department_id)?;
        let mut result = Leaders {
            department: department.name.clone(),
            names: Vec::new(),
            points: 0.0,
        };
        if department.summary.leaders.is_empty() {
            return Ok(result);
        }

        let row = self.day_row(&department.sheet)?;
        let scored: Vec<(String, f64)> = self
            .read_named(&department.sheet, &department.summary.leaders, row)
            .await?
            .into_iter()
            .map(|(name, raw)| {
                let value = points(&name, &raw);
                (name, value)
            })
            .collect();

        let max = scored.iter().map(|(_, p)| *p).fold(0.0, f64::max);
        if max > 0.0 {
            result.names = scored
                .into_iter()
                .filter(|(_, p)| *p == max)
                .map(|(name, _)| name)
                .collect();
            result.points = max;
        }
        Ok(result)
    }

    /// Leaders of every department that has candidates configured.
    pub async fn all_leaders(&self) -> Result<Vec<Leaders>, StatsError> {
        let ids = self
            .config
            .departments
            .iter()
            .filter(|(_, d)| !d.summary.leaders.is_empty())
            .map(|(id, _)| id.as_str());
        try_join_all(ids.map(|id| self.leaders(id))).await
    }

    /// Tracked members with at least one empty KPI cell due today.
    pub async fn missing_kpi(
        &self,
        department_id: &str,
        employees: &[Employee],
    ) -> Result<Vec<i64>, StatsError> {
        let department = self.department(department_id)?;
        let row = self.day_row(&department.sheet)?;
        let weekday = self.weekday();

        let checks = self
            .members(department_id, employees)
            .into_iter()
            .filter(|(employee, _)| self.config.is_tracked(department_id, &employee.position))
            .filter_map(|(employee, layout)| {
                let due = due_kpi_items(layout, weekday);
                (!due.is_empty()).then_some((employee, due))
            })
            .map(|(employee, due)| async move {
                let columns = due
                    .iter()
                    .map(|item| column(&item.column))
                    .collect::<Result<Vec<_>, _>>()?;
                let values = self.sheets.read_row(&department.sheet, &columns, row).await?;
                let missing = values.iter().any(|v| display(v).is_empty());
                Ok::<_, SheetsError>(missing.then_some(employee.user_id))
            });

        Ok(try_join_all(checks).await?.into_iter().flatten().collect())
    }

    /// Employees with at least one empty current-plan cell for `period`.
    pub async fn missing_plan(
        &self,
        period: Period,
        employees: &[Employee],
    ) -> Result<Vec<i64>, StatsError> {
        let checks = employees
            .iter()
            .filter_map(|employee| {
                let department = self.config.department(&employee.department)?;
                let plan = self.config.layout(employee.user_id)?.plans.get(&period)?;
                Some((employee, department, plan))
            })
            .map(|(employee, department, plan)| async move {
                let cells = plan
                    .items
                    .iter()
                    .map(|item| item.cell.parse::<CellAddress>())
                    .collect::<Result<Vec<_>, _>>()?;
                let values = self.read_cells(department.plan_sheet(), &cells).await?;
                let missing = values.iter().any(|v| display(v).is_empty());
                Ok::<_, SheetsError>(missing.then_some(employee.user_id))
            });

        Ok(try_join_all(checks).await?.into_iter().flatten().collect())
    }

    pub async fn key_values(&self) -> Result<Vec<KeyValueLine>, StatsError> {
        let Some(key_values) = &self.config.key_values else {
            return Ok(Vec::new());
        };

        let mut cells = Vec::new();
        for item in &key_values.items {
            for period in &item.periods {
                cells.push(period.actual.parse::<CellAddress>()?);
                if let Some(planned) = &period.planned {
                    cells.push(planned.parse::<CellAddress>()?);
                }
            }
        }
        let mut values = self
            .read_cells(&key_values.sheet, &cells)
            .await?
            .into_iter()
            .map(|v| display(&v));

        Ok(key_values
            .items
            .iter()
            .map(|item| KeyValueLine {
                name: item.name.clone(),
                periods: item
                    .periods
                    .iter()
                    .map(|period| KeyValuePoint {
                        name: period.name.clone(),
                        actual: values.next().unwrap_or_default(),
                        planned: period
                            .planned
                            .as_ref()
                            .map(|_| values.next().unwrap_or_default()),
                    })
                    .collect(),
            })
            .collect())
    }

    /// Fund balances; admin-only funds are left out unless `full`.
    pub async fn funds(&self, full: bool) -> Result<Vec<FundLine>, StatsError> {
        let Some(funds) = &self.config.funds else {
            return Ok(Vec::new());
        };
        let visible: Vec<_> = funds
            .items
            .iter()
            .filter(|fund| full || !fund.admin_only)
            .collect();

        let mut cells = Vec::with_capacity(visible.len() * 2);
        for fund in &visible {
            cells.push(fund.actual.parse::<CellAddress>()?);
            cells.push(fund.planned.parse::<CellAddress>()?);
        }
        let values = self.read_cells(&funds.sheet, &cells).await?;

        Ok(visible
            .iter()
            .zip(values.chunks(2))
            .map(|(fund, pair)| FundLine {
                name: fund.name.clone(),
                actual: pair.first().map(|v| display(v)).unwrap_or_default(),
                planned: pair.get(1).map(|v| display(v)).unwrap_or_default(),
            })
            .collect())
    }

    /// The employee's bonus at today's row; `None` when no bonus column is set up.
    pub async fn bonus(&self, employee: &Employee) -> Result<Option<String>, StatsError> {
        let (Some(sheet), Some(column)) = (
            self.config.bonuses.as_ref(),
            self.config
                .layout(employee.user_id)
                .and_then(|layout| layout.bonus_column.as_deref()),
        ) else {
            return Ok(None);
        };
        let cell = CellAddress::at(column, self.day_row(sheet)?)?;
        let value = self.sheets.read_cell(sheet, cell).await?;
        Ok(Some(display(&value)))
    }

    /// Copies each member's plan/fact block to the previous-plan anchors and clears the plan.
    /// Returns how many employees were rotated.
    pub async fn rotate_plans(
        &self,
        department_id: &str,
        period: Period,
        employees: &[Employee],
    ) -> Result<usize, StatsError> {
        let department = self.department(department_id)?;
        let sheet = department.plan_sheet();
        let mut rotated = 0;

        for (employee, layout) in self.members(department_id, employees) {
            let Some(plan) = layout.plans.get(&period) else {
                continue;
            };
            let Some(first) = plan.items.first() else {
                continue;
            };
            let last = plan
                .fact
                .last()
                .map(String::as_str)
                .unwrap_or_else(|| plan.items[plan.items.len() - 1].cell.as_str());
            let block = CellRange::new(first.cell.parse()?, last.parse()?);

            let rows = self
                .sheets
                .read_ranges(sheet, &[block])
                .await?
                .into_iter()
                .next()
                .unwrap_or_default();
            if rows.len() != plan.previous.len() {
                tracing::error!(
                    "Plan block of {} has {} rows but {} previous anchors; leaving the plan in place",
                    employee.user_id,
                    rows.len(),
                    plan.previous.len()
                );
                continue;
            }

            let writes = plan
                .previous
                .iter()
                .zip(rows)
                .map(|(anchor, row)| {
                    let start: CellAddress = anchor.parse()?;
                    let end = CellAddress::new(start.column + row.len() as u32 - 1, start.row);
                    let values = row.into_iter().map(blank_to_zero).collect();
                    Ok((CellRange::new(start, end), vec![values]))
                })
                .collect::<Result<Vec<_>, SheetsError>>()?;
            self.sheets.write_ranges(sheet, &writes).await?;

            let plan_cells = plan
                .items
                .iter()
                .map(|item| item.cell.parse().map(CellRange::single))
                .collect::<Result<Vec<_>, SheetsError>>()?;
            self.sheets.clear_ranges(sheet, &plan_cells).await?;
            rotated += 1;
        }

        tracing::info!(
            department = department_id,
            period = period.as_str(),
            rotated,
            "Plans rotated"
        );
        Ok(rotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{employee, sample_config, staff, MemorySheets};

    // Wednesday; law rows start at 3 on 2024-01-01.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn law_sheet(config: &OrgConfig) -> SheetRef {
        config.department("law").unwrap().sheet.clone()
    }

    #[test]
    fn due_items_follow_schedule() {
        let config = sample_config();
        let layout = config.layout(100).unwrap();
        let keys = |day| {
            due_kpi_items(layout, day)
                .into_iter()
                .map(|i| i.key.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(2), vec!["hearings", "claims"]);
        assert_eq!(keys(6), vec!["claims"]);
    }

    #[test]
    fn display_strips_non_breaking_spaces() {
        assert_eq!(display("1\u{a0}200"), "1200");
        assert_eq!(display(" 5 "), "5");
    }

    #[tokio::test]
    async fn write_kpi_targets_day_row() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let stats = Statistics::new(&config, &sheets, today());
        let lawyer = employee(100, "law", "lawyer", false);

        let outcome = stats
            .write_kpi(&lawyer, &["hearings".into(), "claims".into()], &[3, 7])
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(sheets.get(&law_sheet(&config), "E12"), "3");
        assert_eq!(sheets.get(&law_sheet(&config), "F12"), "7");
        assert_eq!(sheets.write_count(), 1);

        let stranger = employee(300, "law", "lawyer", false);
        assert_eq!(
            stats.write_kpi(&stranger, &["claims".into()], &[1]).await.unwrap(),
            WriteOutcome::NotInTable
        );
        assert!(matches!(
            stats.write_kpi(&lawyer, &["claims".into()], &[1, 2]).await,
            Err(StatsError::CountMismatch { expected: 1, got: 2 })
        ));
        assert_eq!(sheets.write_count(), 1);
    }

    #[tokio::test]
    async fn weekly_input_lands_on_monday_row() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let stats = Statistics::new(&config, &sheets, today());
        let cell = stats
            .write_input(config.input("lawsuits").unwrap(), 4)
            .await
            .unwrap();
        assert_eq!(cell.to_string(), "D10");
        assert_eq!(sheets.get(&law_sheet(&config), "D10"), "4");
    }

    #[tokio::test]
    async fn write_plan_fills_current_plan_cells() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let stats = Statistics::new(&config, &sheets, today());
        let lawyer = employee(100, "law", "lawyer", false);
        let plan_sheet = config.department("law").unwrap().plan_sheet().clone();

        stats.write_plan(&lawyer, Period::Day, &[10, 2]).await.unwrap();
        assert_eq!(sheets.get(&plan_sheet, "B2"), "10");
        assert_eq!(sheets.get(&plan_sheet, "C2"), "2");
        assert_eq!(
            stats.write_plan(&lawyer, Period::Week, &[1]).await.unwrap(),
            WriteOutcome::NotInTable
        );
    }

    #[tokio::test]
    async fn day_report_reads_totals_and_people() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let sheet = law_sheet(&config);
        sheets.set(&sheet, "B12", "1\u{a0}000");
        sheets.set(&sheet, "C12", "2");
        sheets.set(&sheet, "E12", "3");
        let stats = Statistics::new(&config, &sheets, today());

        let report = stats.day_report("law", &staff()).await.unwrap();
        assert_eq!(report.department, "Юридический отдел");
        assert_eq!(
            report.totals,
            vec![
                ("Иски".to_string(), "1000".to_string()),
                ("Заседания".to_string(), "2".to_string())
            ]
        );
        assert_eq!(report.people.len(), 1);
        assert_eq!(report.people[0].name, "Иван Иванов");
        assert_eq!(
            report.people[0].values,
            vec![
                ("Заседания".to_string(), "3".to_string()),
                ("Иски".to_string(), String::new())
            ]
        );

        assert!(matches!(
            stats.day_report("nowhere", &staff()).await,
            Err(StatsError::UnknownDepartment(_))
        ));
    }

    #[tokio::test]
    async fn week_report_uses_week_row() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        sheets.set(&law_sheet(&config), "D10", "12");
        let stats = Statistics::new(&config, &sheets, today());
        let report = stats.week_report("law").await.unwrap();
        assert_eq!(
            report.totals,
            vec![("Иски за неделю".to_string(), "12".to_string())]
        );
    }

    #[tokio::test]
    async fn leaders_share_the_maximum() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let sheet = law_sheet(&config);
        let stats = Statistics::new(&config, &sheets, today());

        assert!(stats.leaders("law").await.unwrap().names.is_empty());

        sheets.set(&sheet, "L12", "5");
        sheets.set(&sheet, "M12", "5,0");
        let leaders = stats.leaders("law").await.unwrap();
        assert_eq!(leaders.names, vec!["Иванов", "Петров"]);
        assert_eq!(leaders.points, 5.0);

        sheets.set(&sheet, "M12", "n/a");
        assert_eq!(stats.leaders("law").await.unwrap().names, vec!["Иванов"]);
    }

    #[tokio::test]
    async fn missing_kpi_only_checks_tracked_due_cells() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let sheet = law_sheet(&config);
        let stats = Statistics::new(&config, &sheets, today());

        assert_eq!(stats.missing_kpi("law", &staff()).await.unwrap(), vec![100]);
        sheets.set(&sheet, "E12", "0");
        assert_eq!(stats.missing_kpi("law", &staff()).await.unwrap(), vec![100]);
        sheets.set(&sheet, "F12", "1");
        assert!(stats.missing_kpi("law", &staff()).await.unwrap().is_empty());

        // Sales managers are not tracked.
        assert!(stats.missing_kpi("sales", &staff()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_plan_reports_empty_plan_cells() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let plan_sheet = config.department("law").unwrap().plan_sheet().clone();
        let stats = Statistics::new(&config, &sheets, today());

        assert_eq!(
            stats.missing_plan(Period::Day, &staff()).await.unwrap(),
            vec![100]
        );
        sheets.set(&plan_sheet, "B2", "1");
        sheets.set(&plan_sheet, "C2", "1");
        assert!(stats.missing_plan(Period::Day, &staff()).await.unwrap().is_empty());
        assert!(stats.missing_plan(Period::Week, &staff()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn key_values_and_funds_batch_their_reads() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let kv = config.key_values.as_ref().unwrap().sheet.clone();
        let funds = config.funds.as_ref().unwrap().sheet.clone();
        sheets.set(&kv, "B2", "150");
        sheets.set(&kv, "C2", "200");
        sheets.set(&kv, "B3", "1\u{a0}800");
        sheets.set(&funds, "B3", "70");
        let stats = Statistics::new(&config, &sheets, today());

        let lines = stats.key_values().await.unwrap();
        assert_eq!(sheets.read_count(), 1);
        assert_eq!(lines[0].periods[0].actual, "150");
        assert_eq!(lines[0].periods[0].planned.as_deref(), Some("200"));
        assert_eq!(lines[0].periods[1].actual, "1800");
        assert_eq!(lines[0].periods[1].planned, None);

        let partial = stats.funds(false).await.unwrap();
        assert_eq!(partial.len(), 1);
        let full = stats.funds(true).await.unwrap();
        assert_eq!(full.len(), 2);
        assert_eq!(full[1].actual, "70");
    }

    #[tokio::test]
    async fn bonus_reads_bonus_sheet() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        // Bonus rows start at 2 on 2024-01-01.
        sheets.set(config.bonuses.as_ref().unwrap(), "C11", "2\u{a0}500");
        let stats = Statistics::new(&config, &sheets, today());

        let lawyer = employee(100, "law", "lawyer", false);
        assert_eq!(stats.bonus(&lawyer).await.unwrap().as_deref(), Some("2500"));
        let manager = employee(200, "sales", "manager", false);
        assert_eq!(stats.bonus(&manager).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rotation_moves_block_and_clears_plan() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let plan_sheet = config.department("law").unwrap().plan_sheet().clone();
        sheets.set(&plan_sheet, "B2", "10");
        sheets.set(&plan_sheet, "C2", "4");
        sheets.set(&plan_sheet, "B3", "8");
        let stats = Statistics::new(&config, &sheets, today());

        let rotated = stats.rotate_plans("law", Period::Day, &staff()).await.unwrap();
        assert_eq!(rotated, 1);
        assert_eq!(sheets.get(&plan_sheet, "E2"), "10");
        assert_eq!(sheets.get(&plan_sheet, "F2"), "4");
        assert_eq!(sheets.get(&plan_sheet, "E3"), "8");
        assert_eq!(sheets.get(&plan_sheet, "F3"), "0");
        assert_eq!(sheets.get(&plan_sheet, "B2"), "");
        assert_eq!(sheets.get(&plan_sheet, "C2"), "");
        // Facts stay.
        assert_eq!(sheets.get(&plan_sheet, "B3"), "8");
    }

    #[tokio::test]
    async fn rotation_keeps_plan_without_anchors() {
        let mut config = sample_config();
        config
            .employees
            .get_mut(&100)
            .unwrap()
            .plans
            .get_mut(&Period::Day)
            .unwrap()
            .previous
            .clear();
        let sheets = MemorySheets::default();
        let plan_sheet = config.department("law").unwrap().plan_sheet().clone();
        sheets.set(&plan_sheet, "B2", "10");
        sheets.set(&plan_sheet, "C2", "4");
        let stats = Statistics::new(&config, &sheets, today());

        let rotated = stats.rotate_plans("law", Period::Day, &staff()).await.unwrap();
        assert_eq!(rotated, 0);
        assert_eq!(sheets.get(&plan_sheet, "B2"), "10");
        assert_eq!(sheets.get(&plan_sheet, "C2"), "4");
        assert_eq!(sheets.write_count(), 0);
    }

    #[tokio::test]
    async fn dates_before_start_fail() {
        let config = sample_config();
        let sheets = MemorySheets::default();
        let early = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let stats = Statistics::new(&config, &sheets, early);
        assert!(matches!(
            stats.week_report("law").await,
            Err(StatsError::Sheets(SheetsError::BeforeStart(_)))
        ));
    }
}
