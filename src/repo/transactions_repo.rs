use crate::domain::transaction::{
    LogEntry, NewLogEntry, NewTransaction, Settlement, Transaction, TransactionStatus,
};
use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// Persistence for gateway transactions and their audit log.
///
/// `mark_succeeded` and `mark_failed` only touch rows still in `INIT` and
/// return whether the row transitioned.
#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(&self, new: NewTransaction) -> Result<i64>;
    async fn find(&self, id: i64) -> Result<Option<Transaction>>;
    async fn set_ref_id(&self, id: i64, ref_id: &str) -> Result<()>;
    async fn mark_succeeded(&self, id: i64, settlement: &Settlement) -> Result<bool>;
    async fn mark_failed(&self, id: i64) -> Result<bool>;
    async fn append_log(&self, entry: NewLogEntry) -> Result<()>;
    async fn logs(&self, transaction_id: i64) -> Result<Vec<LogEntry>>;
}

#[derive(Clone)]
pub struct TransactionsRepo {
    pub pool: PgPool,
    table: String,
    logs_table: String,
}

impl TransactionsRepo {
    /// Table names are interpolated into SQL, so they are restricted to
    /// identifier characters.
    pub fn new(pool: PgPool, table: &str) -> Result<Self> {
        if !is_valid_table_name(table) {
            return Err(anyhow!("invalid transactions table name `{table}`"));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
            logs_table: format!("{table}_logs"),
        })
    }

    /// Creates the transactions and logs tables under the configured names.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in schema_statements(&self.table, &self.logs_table) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        tracing::info!(table = %self.table, logs_table = %self.logs_table, "transaction schema ready");
        Ok(())
    }
}

fn schema_statements(table: &str, logs_table: &str) -> Vec<String> {
    vec![
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                port TEXT NOT NULL,
                price BIGINT NOT NULL,
                ref_id TEXT,
                tracking_code TEXT,
                card_number TEXT,
                status TEXT NOT NULL DEFAULT 'INIT' CHECK (status IN ('INIT', 'SUCCEED', 'FAILED')),
                ip TEXT,
                payment_date TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_port_status ON {table} (port, status)"),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {logs_table} (
                id BIGSERIAL PRIMARY KEY,
                transaction_id BIGINT NOT NULL REFERENCES {table} (id),
                result_code TEXT NOT NULL,
                result_message TEXT NOT NULL,
                log_date TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{logs_table}_transaction ON {logs_table} (transaction_id)"
        ),
    ]
}

fn transaction_from_row(r: &PgRow) -> Result<Transaction> {
    let port: String = r.get("port");
    let status: String = r.get("status");
    Ok(Transaction {
        id: r.get("id"),
        port: port
            .parse()
            .map_err(|_| anyhow!("unknown port `{port}` in transaction row"))?,
        price: r.get("price"),
        ref_id: r.get("ref_id"),
        tracking_code: r.get("tracking_code"),
        card_number: r.get("card_number"),
        status: TransactionStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown status `{status}` in transaction row"))?,
        ip: r.get("ip"),
        payment_date: r.get("payment_date"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

#[async_trait::async_trait]
impl TransactionStore for TransactionsRepo {
    async fn create(&self, new: NewTransaction) -> Result<i64> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO {} (port, price, status, ip, created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now())
            RETURNING id
            "#,
            self.table
        ))
        .bind(new.port.as_str())
        .bind(new.price)
        .bind(TransactionStatus::Init.as_str())
        .bind(new.ip)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn find(&self, id: i64) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT id, port, price, ref_id, tracking_code, card_number, status, ip, payment_date, created_at, updated_at FROM {} WHERE id = $1",
            self.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn set_ref_id(&self, id: i64, ref_id: &str) -> Result<()> {
        sqlx::query(&format!(
            "UPDATE {} SET ref_id = $2, updated_at = now() WHERE id = $1",
            self.table
        ))
        .bind(id)
        .bind(ref_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_succeeded(&self, id: i64, settlement: &Settlement) -> Result<bool> {
        let result = sqlx::query(&format!(
            r#"
            UPDATE {}
            SET status = $2,
                ref_id = COALESCE($3, ref_id),
                tracking_code = $4,
                card_number = $5,
                payment_date = now(),
                updated_at = now()
            WHERE id = $1 AND status = $6
            "#,
            self.table
        ))
        .bind(id)
        .bind(TransactionStatus::Succeed.as_str())
        .bind(settlement.ref_id.clone())
        .bind(settlement.tracking_code.clone())
        .bind(settlement.card_number.clone())
        .bind(TransactionStatus::Init.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET status = $2, updated_at = now() WHERE id = $1 AND status = $3",
            self.table
        ))
        .bind(id)
        .bind(TransactionStatus::Failed.as_str())
        .bind(TransactionStatus::Init.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn append_log(&self, entry: NewLogEntry) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (transaction_id, result_code, result_message, log_date)
            VALUES ($1, $2, $3, now())
            "#,
            self.logs_table
        ))
        .bind(entry.transaction_id)
        .bind(entry.result_code)
        .bind(entry.result_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn logs(&self, transaction_id: i64) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT id, transaction_id, result_code, result_message, log_date FROM {} WHERE transaction_id = $1 ORDER BY id ASC",
            self.logs_table
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LogEntry {
                id: r.get("id"),
                transaction_id: r.get("transaction_id"),
                result_code: r.get("result_code"),
                result_message: r.get("result_message"),
                log_date: r.get("log_date"),
            })
            .collect())
    }
}

fn is_valid_table_name(table: &str) -> bool {
    !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_plain_identifiers() {
        assert!(is_valid_table_name("gateway_transactions"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("tx; DROP TABLE users"));
        assert!(!is_valid_table_name("public.tx"));
    }

    #[test]
    fn schema_follows_configured_table_name() {
        let statements = schema_statements("shop_payments", "shop_payments_logs");
        assert_eq!(statements.len(), 4);
        assert!(statements[0].contains("CREATE TABLE IF NOT EXISTS shop_payments ("));
        assert!(statements[2].contains("CREATE TABLE IF NOT EXISTS shop_payments_logs ("));
        assert!(statements[2].contains("REFERENCES shop_payments (id)"));
        assert!(statements[3].contains("ON shop_payments_logs (transaction_id)"));
        assert!(statements.iter().all(|s| !s.contains("gateway_transactions")));
    }
}
