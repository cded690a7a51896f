use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::models::{Account, AccountRow};
use crate::storage::{Storage, StorageError};

const CREATE_ACCOUNT_TABLE: &str = "CREATE TABLE IF NOT EXISTS account (
        id serial primary key,
        first_name varchar(50),
        last_name varchar(50),
        number int,
        balance int,
        created_at timestamp
    )";

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Opens the pool and checks connectivity once. There is no retry: a
    /// database that is down at startup is a startup failure.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let options: PgConnectOptions = match &config.url {
            Some(url) => url.parse()?,
            None => PgConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.user)
                .password(&config.password)
                .database(&config.name)
                .ssl_mode(config.ssl_mode),
        };

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool);
        store.ping().await?;
        info!("Connected to Postgres");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensures the `account` table exists.
    pub async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_ACCOUNT_TABLE)
            .execute(&self.pool)
            .await?;
        debug!("account table ready");
        Ok(())
    }
}

fn to_column(field: &str, value: i64) -> Result<i32, StorageError> {
    i32::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("{} {} does not fit the column", field, value)))
}

#[async_trait]
impl Storage for PostgresStore {
    async fn create_account(&self, account: Account) -> Result<Account, StorageError> {
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO account (first_name, last_name, number, balance, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(to_column("number", account.number)?)
        .bind(to_column("balance", account.balance)?)
        .bind(account.created_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        Ok(Account { id, ..account })
    }

    async fn delete_account(&self, id: i32) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        debug!("Deleted {} account row(s) for id {}", result.rows_affected(), id);
        Ok(())
    }

    async fn update_account(&self, _account: &Account) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get_account_by_id(&self, id: i32) -> Result<Account, StorageError> {
        sqlx::query_as::<_, AccountRow>(
            "SELECT id, first_name, last_name, number, balance, created_at
             FROM account
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Account::from)
        .ok_or(StorageError::NotFound { id })
    }

    async fn get_accounts(&self) -> Result<Vec<Account>, StorageError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, first_name, last_name, number, balance, created_at
             FROM account
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
