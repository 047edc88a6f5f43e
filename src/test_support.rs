//! In-memory collaborators and a sample organization for tests.

use crate::bot::dialogue::DialogueStore;
use crate::bot::messenger::{Keyboard, Messenger};
use crate::config::OrgConfig;
use crate::db::{Employee, EmployeeDirectory, NewEmployee, TaskLedger};
use crate::sheets::{CellAddress, CellRange, SheetRef, SheetsError, SpreadsheetClient};
use crate::state::{AppState, SharedState};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SAMPLE_CONFIG: &str = r#"{
  "timezone": "Europe/Moscow",
  "start_date": "2024-01-01",
  "contacts": "@office_manager",
  "departments": {
    "law": {
      "name": "Юридический отдел",
      "sheet": { "table": "doc-law", "sheet": "KPI", "start_row": 3 },
      "positions": {
        "lawyer": { "name": "Юрист", "tracked": true },
        "assistant": { "name": "Помощник" }
      },
      "summary": {
        "day": [
          { "name": "Иски", "column": "B" },
          { "name": "Заседания", "column": "C" }
        ],
        "week": [{ "name": "Иски за неделю", "column": "D" }],
        "leaders": [
          { "name": "Иванов", "column": "L" },
          { "name": "Петров", "column": "M" }
        ]
      },
      "plan_sheet": { "table": "doc-law", "sheet": "Планы", "start_row": 1 }
    },
    "sales": {
      "name": "Продажи",
      "sheet": { "table": "doc-sales", "sheet": "KPI", "start_row": 2 },
      "positions": { "manager": { "name": "Менеджер" } },
      "summary": { "day": [{ "name": "Звонки", "column": "B" }] }
    }
  },
  "employees": {
    "100": {
      "kpi": [
        { "key": "hearings", "name": "Заседания", "question": "Сколько заседаний?", "column": "E", "schedule": [0, 1, 2, 3, 4] },
        { "key": "claims", "name": "Иски", "question": "Сколько исков?", "column": "F" }
      ],
      "plans": {
        "day": {
          "items": [
            { "name": "Звонки", "cell": "B2" },
            { "name": "Встречи", "cell": "C2" }
          ],
          "fact": ["C3"],
          "previous": ["E2", "E3"]
        }
      },
      "bonus_column": "C"
    },
    "200": {
      "kpi": [
        { "key": "calls", "name": "Звонки", "question": "Сколько звонков?", "column": "G" }
      ]
    }
  },
  "inputs": [
    {
      "key": "lawsuits",
      "name": "Иски за неделю",
      "question": "Сколько исков подано за неделю?",
      "department": "law",
      "column": "D",
      "period": "week",
      "reminder": "Пора внести иски за неделю",
      "recipients": [1, 999]
    }
  ],
  "key_values": {
    "sheet": { "table": "doc-kv", "sheet": "Ключевые" },
    "items": [
      {
        "name": "Выручка",
        "periods": [
          { "name": "Месяц", "actual": "B2", "planned": "C2" },
          { "name": "Год", "actual": "B3" }
        ]
      }
    ]
  },
  "funds": {
    "sheet": { "table": "doc-kv", "sheet": "Фонды" },
    "items": [
      { "name": "Резерв", "actual": "B2", "planned": "C2" },
      { "name": "Премии", "actual": "B3", "planned": "C3", "admin_only": true }
    ]
  },
  "bonuses": { "table": "doc-bonus", "sheet": "Бонусы", "start_row": 2 },
  "tasks": [
    { "time": "20:00", "action": "kpi_reminder" },
    { "time": "20:30", "action": "kpi_reminder", "second": true },
    { "time": "21:00", "action": "day_report" },
    { "time": "21:05", "days": [4], "action": "week_report" },
    { "time": "18:00", "days": [4], "action": "input_reminder", "input": "lawsuits" },
    { "time": "22:10", "days": [0, 1, 2, 3, 4, 5, 6], "action": "rotate_plans", "department": "law", "period": "day" },
    { "time": "10:00", "action": "plan_reminder", "period": "day" }
  ]
}"#;

pub fn sample_config() -> OrgConfig {
    OrgConfig::from_json(SAMPLE_CONFIG).unwrap()
}

pub fn employee(user_id: i64, department: &str, position: &str, is_admin: bool) -> Employee {
    let (firstname, lastname) = match user_id {
        1 => ("Анна", "Смирнова"),
        100 => ("Иван", "Иванов"),
        200 => ("Пётр", "Петров"),
        300 => ("Олег", "Сидоров"),
        _ => ("Тест", "Тестов"),
    };
    Employee {
        user_id,
        username: format!("user{user_id}"),
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
        department: department.to_string(),
        position: position.to_string(),
        is_admin,
    }
}

/// Admin 1, lawyer 100 with a layout, manager 200, lawyer 300 without a layout.
pub fn staff() -> Vec<Employee> {
    vec![
        employee(1, "law", "assistant", true),
        employee(100, "law", "lawyer", false),
        employee(200, "sales", "manager", false),
        employee(300, "law", "lawyer", false),
    ]
}

/// Wednesday 2024-01-10, 12:00 in Moscow.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
}

type CellKey = (String, String, CellAddress);

#[derive(Default)]
pub struct MemorySheets {
    cells: Mutex<HashMap<CellKey, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemorySheets {
    fn key(sheet: &SheetRef, cell: CellAddress) -> CellKey {
        (sheet.table.clone(), sheet.sheet.clone(), cell)
    }

    pub fn set(&self, sheet: &SheetRef, cell: &str, value: &str) {
        let cell: CellAddress = cell.parse().unwrap();
        self.cells
            .lock()
            .unwrap()
            .insert(Self::key(sheet, cell), value.to_string());
    }

    pub fn get(&self, sheet: &SheetRef, cell: &str) -> String {
        let cell: CellAddress = cell.parse().unwrap();
        self.cells
            .lock()
            .unwrap()
            .get(&Self::key(sheet, cell))
            .cloned()
            .unwrap_or_default()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every later call fails like an unavailable API.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), SheetsError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SheetsError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SpreadsheetClient for MemorySheets {
    async fn read_ranges(
        &self,
        sheet: &SheetRef,
        ranges: &[CellRange],
    ) -> Result<Vec<Vec<Vec<String>>>, SheetsError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let cells = self.cells.lock().unwrap();
        Ok(ranges
            .iter()
            .map(|range| {
                (range.start.row..=range.end.row)
                    .map(|row| {
                        (range.start.column..=range.end.column)
                            .map(|column| {
                                cells
                                    .get(&Self::key(sheet, CellAddress::new(column, row)))
                                    .cloned()
                                    .unwrap_or_default()
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect())
    }

    async fn write_ranges(
        &self,
        sheet: &SheetRef,
        writes: &[(CellRange, Vec<Vec<String>>)],
    ) -> Result<(), SheetsError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut cells = self.cells.lock().unwrap();
        for (range, rows) in writes {
            for (i, row) in rows.iter().enumerate() {
                for (j, value) in row.iter().enumerate() {
                    let cell = CellAddress::new(range.start.column + j as u32, range.start.row + i as u32);
                    cells.insert(Self::key(sheet, cell), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn clear_ranges(&self, sheet: &SheetRef, ranges: &[CellRange]) -> Result<(), SheetsError> {
        self.check()?;
        let mut cells = self.cells.lock().unwrap();
        for range in ranges {
            for row in range.start.row..=range.end.row {
                for column in range.start.column..=range.end.column {
                    cells.remove(&Self::key(sheet, CellAddress::new(column, row)));
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    employees: Mutex<Vec<Employee>>,
    runs: Mutex<HashSet<(String, NaiveDate)>>,
}

impl MemoryDirectory {
    pub fn with(employees: Vec<Employee>) -> Self {
        Self {
            employees: Mutex::new(employees),
            runs: Mutex::default(),
        }
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryDirectory {
    async fn find(&self, user_id: i64) -> anyhow::Result<Option<Employee>> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.user_id == user_id)
            .cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<Employee>> {
        Ok(self.employees.lock().unwrap().clone())
    }

    async fn add(&self, employee: NewEmployee) -> anyhow::Result<bool> {
        let mut employees = self.employees.lock().unwrap();
        if employees.iter().any(|e| e.user_id == employee.user_id) {
            return Ok(false);
        }
        employees.push(employee.into());
        Ok(true)
    }

    async fn remove(&self, user_id: i64) -> anyhow::Result<bool> {
        let mut employees = self.employees.lock().unwrap();
        let before = employees.len();
        employees.retain(|e| e.user_id != user_id);
        Ok(employees.len() < before)
    }
}

#[async_trait]
impl TaskLedger for MemoryDirectory {
    async fn claim_run(&self, task: &str, date: NaiveDate) -> anyhow::Result<bool> {
        Ok(self.runs.lock().unwrap().insert((task.to_string(), date)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Keyboard,
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    answers: Mutex<Vec<(String, Option<String>)>>,
    blocked: Mutex<HashSet<i64>>,
}

impl RecordingMessenger {
    /// Sends to `chat_id` fail from now on.
    pub fn block(&self, chat_id: i64) {
        self.blocked.lock().unwrap().insert(chat_id);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|s| s.chat_id == chat_id)
            .map(|s| s.text)
            .collect()
    }

    pub fn last_to(&self, chat_id: i64) -> Option<Sent> {
        self.sent().into_iter().rev().find(|s| s.chat_id == chat_id)
    }

    pub fn answers(&self) -> Vec<(String, Option<String>)> {
        self.answers.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.answers.lock().unwrap().clear();
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> anyhow::Result<()> {
        if self.blocked.lock().unwrap().contains(&chat_id) {
            anyhow::bail!("Forbidden: bot was blocked by the user");
        }
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()> {
        self.answers
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}

pub struct Harness {
    pub state: SharedState,
    pub sheets: Arc<MemorySheets>,
    pub directory: Arc<MemoryDirectory>,
    pub messenger: Arc<RecordingMessenger>,
}

pub fn harness() -> Harness {
    harness_with(sample_config(), None)
}

pub fn harness_with(config: OrgConfig, webhook_secret: Option<&str>) -> Harness {
    let sheets = Arc::new(MemorySheets::default());
    let directory = Arc::new(MemoryDirectory::with(staff()));
    let messenger = Arc::new(RecordingMessenger::default());
    let state = Arc::new(AppState {
        config: Arc::new(config),
        directory: directory.clone(),
        ledger: directory.clone(),
        sheets: sheets.clone(),
        messenger: messenger.clone(),
        dialogues: DialogueStore::default(),
        webhook_secret: webhook_secret.map(str::to_string),
        bot_username: Some("kpi_bot".to_string()),
        clock: fixed_now,
    });
    Harness {
        state,
        sheets,
        directory,
        messenger,
    }
}
