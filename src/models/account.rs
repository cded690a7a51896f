use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Upper bound (exclusive) for generated account numbers.
pub const ACCOUNT_NUMBER_RANGE: i64 = 100_000;

// A bank-style account. `id` is 0 until the record has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub number: i64,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub first_name: String,
    pub last_name: String,
}

impl Account {
    pub fn new(first_name: String, last_name: String) -> Self {
        Self {
            id: 0,
            first_name,
            last_name,
            number: rand::rng().random_range(0..ACCOUNT_NUMBER_RANGE),
            balance: 0,
            // Postgres keeps microseconds only
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

impl From<CreateAccountRequest> for Account {
    fn from(req: CreateAccountRequest) -> Self {
        Account::new(req.first_name, req.last_name)
    }
}

/// Row shape of the `account` table. Columns are nullable and narrower than
/// the API types, so rows go through this struct before becoming an `Account`.
#[derive(Debug, FromRow)]
pub struct AccountRow {
    pub id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub number: Option<i32>,
    pub balance: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name.unwrap_or_default(),
            number: row.number.map(i64::from).unwrap_or_default(),
            balance: row.balance.map(i64::from).unwrap_or_default(),
            created_at: row
                .created_at
                .map(|ts| ts.and_utc())
                .unwrap_or_default(),
        }
    }
}
