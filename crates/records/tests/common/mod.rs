#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use daysheet_events::EventBus;
use daysheet_records::hierarchy::DEFAULT_ROOT_NAME;
use daysheet_records::{DailyFirings, EmployeeRecord, Hierarchy, JsonDirectory, Workspace};
use daysheet_store::{MemoryStore, StoreHandle};

/// Everything an integration test needs, wired the way the worker wires it
/// but backed by an in-memory store and directory.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub hierarchy: Arc<Hierarchy>,
    pub directory: Arc<JsonDirectory>,
    pub events: Arc<EventBus>,
    pub workspace: Workspace,
    pub firings: DailyFirings,
}

pub fn env(employees: Vec<EmployeeRecord>) -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let hierarchy = Arc::new(Hierarchy::new(StoreHandle::new(store.clone()), DEFAULT_ROOT_NAME));
    let directory = Arc::new(JsonDirectory::in_memory(employees));
    let events = Arc::new(EventBus::new(64));
    let workspace = Workspace::new(hierarchy.clone(), directory.clone());
    let firings = DailyFirings::new(hierarchy.clone(), directory.clone(), events.clone());
    TestEnv {
        store,
        hierarchy,
        directory,
        events,
        workspace,
        firings,
    }
}

pub fn alice() -> EmployeeRecord {
    EmployeeRecord::new("E-1", "Alice", "alice@example.com")
}

pub fn bob() -> EmployeeRecord {
    EmployeeRecord::new("E-2", "Bob", "bob@example.com").mentor()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Generate `year`/`month` for `employee_id` and return the id of the day
/// document for `day`.
pub async fn day_document(env: &TestEnv, employee_id: &str, year: i32, month: u32, day: u32) -> String {
    env.workspace.generate_month(employee_id, year, month).await.unwrap();
    let employee = env.workspace_employee(employee_id).await;
    let folder = env.hierarchy.find_employee(&employee).await.unwrap().unwrap();
    let month_id = env
        .hierarchy
        .month_container(&folder, year, month, false)
        .await
        .unwrap()
        .unwrap();
    env.hierarchy
        .find_document(&month_id, &format!("Day {day}"))
        .await
        .unwrap()
        .unwrap()
}

impl TestEnv {
    pub async fn workspace_employee(&self, employee_id: &str) -> EmployeeRecord {
        use daysheet_records::EmployeeDirectory;
        self.directory.get(employee_id).await.unwrap()
    }
}
