use crate::domain::transaction::{
    LogEntry, NewLogEntry, NewTransaction, Settlement, Transaction, TransactionStatus,
};
use crate::repo::transactions_repo::TransactionStore;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    transactions: BTreeMap<i64, Transaction>,
    logs: Vec<LogEntry>,
}

/// Process-local store with the same transition rules as the Postgres repo.
/// Used by the test suite and for running the service without a database.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a row, for seeding test fixtures.
    pub async fn put(&self, tx: Transaction) {
        self.tables.write().await.transactions.insert(tx.id, tx);
    }
}

#[async_trait::async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, new: NewTransaction) -> Result<i64> {
        let mut tables = self.tables.write().await;
        let id = tables.transactions.keys().next_back().copied().unwrap_or(0) + 1;
        let now = chrono::Utc::now();
        tables.transactions.insert(
            id,
            Transaction {
                id,
                port: new.port,
                price: new.price,
                ref_id: None,
                tracking_code: None,
                card_number: None,
                status: TransactionStatus::Init,
                ip: new.ip,
                payment_date: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn find(&self, id: i64) -> Result<Option<Transaction>> {
        Ok(self.tables.read().await.transactions.get(&id).cloned())
    }

    async fn set_ref_id(&self, id: i64, ref_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let tx = tables
            .transactions
            .get_mut(&id)
            .ok_or_else(|| anyhow!("transaction {id} does not exist"))?;
        tx.ref_id = Some(ref_id.to_string());
        tx.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn mark_succeeded(&self, id: i64, settlement: &Settlement) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(tx) = tables.transactions.get_mut(&id) else {
            return Ok(false);
        };
        if tx.status != TransactionStatus::Init {
            return Ok(false);
        }
        let now = chrono::Utc::now();
        tx.status = TransactionStatus::Succeed;
        if settlement.ref_id.is_some() {
            tx.ref_id = settlement.ref_id.clone();
        }
        tx.tracking_code = settlement.tracking_code.clone();
        tx.card_number = settlement.card_number.clone();
        tx.payment_date = Some(now);
        tx.updated_at = now;
        Ok(true)
    }

    async fn mark_failed(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(tx) = tables.transactions.get_mut(&id) else {
            return Ok(false);
        };
        if tx.status != TransactionStatus::Init {
            return Ok(false);
        }
        tx.status = TransactionStatus::Failed;
        tx.updated_at = chrono::Utc::now();
        Ok(true)
    }

    async fn append_log(&self, entry: NewLogEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        let id = tables.logs.len() as i64 + 1;
        tables.logs.push(LogEntry {
            id,
            transaction_id: entry.transaction_id,
            result_code: entry.result_code,
            result_message: entry.result_message,
            log_date: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn logs(&self, transaction_id: i64) -> Result<Vec<LogEntry>> {
        Ok(self
            .tables
            .read()
            .await
            .logs
            .iter()
            .filter(|l| l.transaction_id == transaction_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::PortName;

    fn new_tx(price: i64) -> NewTransaction {
        NewTransaction {
            port: PortName::Saman,
            price,
            ip: None,
        }
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let store = InMemoryTransactionStore::new();
        assert_eq!(store.create(new_tx(1000)).await.unwrap(), 1);
        assert_eq!(store.create(new_tx(2000)).await.unwrap(), 2);
        let tx = store.find(2).await.unwrap().unwrap();
        assert_eq!(tx.price, 2000);
        assert_eq!(tx.status, TransactionStatus::Init);
    }

    #[tokio::test]
    async fn finalizes_only_once() {
        let store = InMemoryTransactionStore::new();
        let id = store.create(new_tx(1000)).await.unwrap();

        assert!(store.mark_failed(id).await.unwrap());
        assert!(!store.mark_failed(id).await.unwrap());
        assert!(!store.mark_succeeded(id, &Settlement::default()).await.unwrap());
        assert_eq!(
            store.find(id).await.unwrap().unwrap().status,
            TransactionStatus::Failed
        );
    }

    #[tokio::test]
    async fn success_records_settlement() {
        let store = InMemoryTransactionStore::new();
        let id = store.create(new_tx(1000)).await.unwrap();
        store.set_ref_id(id, "REF-1").await.unwrap();

        let settled = store
            .mark_succeeded(
                id,
                &Settlement {
                    ref_id: None,
                    tracking_code: Some("TRK".to_string()),
                    card_number: Some("1234".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(settled);

        let tx = store.find(id).await.unwrap().unwrap();
        assert_eq!(tx.ref_id.as_deref(), Some("REF-1"));
        assert_eq!(tx.tracking_code.as_deref(), Some("TRK"));
        assert!(tx.payment_date.is_some());
    }

    #[tokio::test]
    async fn logs_are_scoped_to_transaction() {
        let store = InMemoryTransactionStore::new();
        for (tx, code) in [(1, "100"), (2, "-1"), (1, "101")] {
            store
                .append_log(NewLogEntry {
                    transaction_id: tx,
                    result_code: code.to_string(),
                    result_message: String::new(),
                })
                .await
                .unwrap();
        }
        let codes: Vec<_> = store
            .logs(1)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.result_code)
            .collect();
        assert_eq!(codes, vec!["100", "101"]);
    }
}
