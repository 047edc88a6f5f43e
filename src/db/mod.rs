use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub user_id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub department: String,
    pub position: String,
    pub is_admin: bool,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub user_id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub department: String,
    pub position: String,
    pub is_admin: bool,
}

impl From<NewEmployee> for Employee {
    fn from(new: NewEmployee) -> Self {
        Self {
            user_id: new.user_id,
            username: new.username,
            firstname: new.firstname,
            lastname: new.lastname,
            department: new.department,
            position: new.position,
            is_admin: new.is_admin,
        }
    }
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn find(&self, user_id: i64) -> Result<Option<Employee>>;
    async fn list(&self) -> Result<Vec<Employee>>;
    /// False when the id is already registered.
    async fn add(&self, employee: NewEmployee) -> Result<bool>;
    /// False when nobody had the id.
    async fn remove(&self, user_id: i64) -> Result<bool>;

    async fn ids(&self) -> Result<Vec<i64>> {
        Ok(self.list().await?.into_iter().map(|e| e.user_id).collect())
    }
}

/// Records which scheduled tasks already ran on a local date.
#[async_trait]
pub trait TaskLedger: Send + Sync {
    /// True exactly once per (task, date).
    async fn claim_run(&self, task: &str, date: NaiveDate) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for PgDirectory {
    async fn find(&self, user_id: i64) -> Result<Option<Employee>> {
        find_employee(&self.pool, user_id).await
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        list_employees(&self.pool).await
    }

    async fn add(&self, employee: NewEmployee) -> Result<bool> {
        insert_employee(&self.pool, &employee).await
    }

    async fn remove(&self, user_id: i64) -> Result<bool> {
        delete_employee(&self.pool, user_id).await
    }

    async fn ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT user_id FROM employees ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl TaskLedger for PgDirectory {
    async fn claim_run(&self, task: &str, date: NaiveDate) -> Result<bool> {
        mark_task_run(&self.pool, task, date).await
    }
}

pub async fn find_employee(pool: &PgPool, user_id: i64) -> Result<Option<Employee>> {
    let employee = sqlx::query_as::<_, Employee>(
        r#"
        SELECT user_id, username, firstname, lastname, department, position, is_admin
        FROM employees
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(employee)
}

pub async fn list_employees(pool: &PgPool) -> Result<Vec<Employee>> {
    let employees = sqlx::query_as::<_, Employee>(
        r#"
        SELECT user_id, username, firstname, lastname, department, position, is_admin
        FROM employees
        ORDER BY created_at, user_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(employees)
}

pub async fn insert_employee(pool: &PgPool, employee: &NewEmployee) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO employees (user_id, username, firstname, lastname, department, position, is_admin)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(employee.user_id)
    .bind(&employee.username)
    .bind(&employee.firstname)
    .bind(&employee.lastname)
    .bind(&employee.department)
    .bind(&employee.position)
    .bind(employee.is_admin)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_employee(pool: &PgPool, user_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM employees WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Mark a scheduled task as run for a local date (idempotent)
pub async fn mark_task_run(pool: &PgPool, task: &str, run_date: NaiveDate) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO task_runs (task, run_date)
        VALUES ($1, $2)
        ON CONFLICT (task, run_date) DO NOTHING
        "#,
    )
    .bind(task)
    .bind(run_date)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Drops ledger rows older than `before`; the ledger only matters for today.
pub async fn prune_task_runs(pool: &PgPool, before: NaiveDate) -> Result<u64> {
    let result = sqlx::query("DELETE FROM task_runs WHERE run_date < $1")
        .bind(before)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
