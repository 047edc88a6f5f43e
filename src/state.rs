use crate::bot::dialogue::DialogueStore;
use crate::bot::messenger::Messenger;
use crate::config::OrgConfig;
use crate::db::{EmployeeDirectory, TaskLedger};
use crate::sheets::SpreadsheetClient;
use crate::statistics::Statistics;
use crate::time_utils::{self, LocalMoment};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct AppState {
    pub config: Arc<OrgConfig>,
    pub directory: Arc<dyn EmployeeDirectory>,
    pub ledger: Arc<dyn TaskLedger>,
    pub sheets: Arc<dyn SpreadsheetClient>,
    pub messenger: Arc<dyn Messenger>,
    pub dialogues: DialogueStore, // chat_id -> active dialogue
    pub webhook_secret: Option<String>,
    pub bot_username: Option<String>,
    pub clock: fn() -> DateTime<Utc>,
}

impl AppState {
    /// Current time in the organization's timezone.
    pub fn local_now(&self) -> LocalMoment {
        time_utils::local_moment(&self.config.timezone, (self.clock)())
    }

    pub fn statistics(&self) -> Statistics<'_> {
        Statistics::new(&self.config, self.sheets.as_ref(), self.local_now().date)
    }
}

pub type SharedState = Arc<AppState>;
