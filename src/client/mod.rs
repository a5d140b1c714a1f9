//! Transaction client stub
//!
//! In-memory stand-in for the transaction surface of a real transport
//! client. Nothing is actually isolated or rolled back — the engine has
//! no transactional semantics — but code written against the contract can
//! run, and tests can assert on what was committed and what was rolled
//! back. The real networked client lives outside this crate.

use std::sync::{Arc, RwLock};

/// Outcome of a stub transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Neither committed nor rolled back yet
    Pending,
    /// `commit` was called
    Committed,
    /// `rollback` was called
    RolledBack,
}

#[derive(Debug)]
struct TransactionInner {
    state: RwLock<TransactionState>,
}

/// One stub transaction handle
#[derive(Debug, Clone)]
pub struct TransactionStub {
    inner: Arc<TransactionInner>,
}

impl TransactionStub {
    fn new() -> Self {
        Self {
            inner: Arc::new(TransactionInner {
                state: RwLock::new(TransactionState::Pending),
            }),
        }
    }

    /// Mark the transaction committed
    pub fn commit(&self) {
        *self.inner.state.write().unwrap() = TransactionState::Committed;
    }

    /// Mark the transaction rolled back
    pub fn rollback(&self) {
        *self.inner.state.write().unwrap() = TransactionState::RolledBack;
    }

    /// Current outcome
    pub fn state(&self) -> TransactionState {
        *self.inner.state.read().unwrap()
    }

    /// Whether `commit` was called
    pub fn is_committed(&self) -> bool {
        self.state() == TransactionState::Committed
    }

    /// Whether `rollback` was called
    pub fn is_rolled_back(&self) -> bool {
        self.state() == TransactionState::RolledBack
    }
}

#[derive(Debug, Default)]
struct ClientCounts {
    transactions: u64,
    commits: u64,
    rollbacks: u64,
}

#[derive(Debug, Default)]
struct ClientInner {
    transactions: RwLock<Vec<TransactionStub>>,
    counts: RwLock<ClientCounts>,
}

/// Transaction-capable client stub
#[derive(Debug, Clone, Default)]
pub struct ClientStub {
    inner: Arc<ClientInner>,
}

impl ClientStub {
    /// A fresh stub with no recorded transactions
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a closure inside a stub transaction: committed on `Ok`,
    /// rolled back on `Err`, result passed through either way.
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&TransactionStub) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let tx = self.begin();
        match f(&tx) {
            Ok(value) => {
                tx.commit();
                self.inner.counts.write().unwrap().commits += 1;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                self.inner.counts.write().unwrap().rollbacks += 1;
                Err(err)
            }
        }
    }

    /// Open a transaction for manual commit/rollback
    pub fn begin(&self) -> TransactionStub {
        let tx = TransactionStub::new();
        self.inner.transactions.write().unwrap().push(tx.clone());
        self.inner.counts.write().unwrap().transactions += 1;
        tx
    }

    /// Every transaction opened since the last reset, in order
    pub fn transactions(&self) -> Vec<TransactionStub> {
        self.inner.transactions.read().unwrap().clone()
    }

    /// Number of transactions opened
    pub fn transaction_count(&self) -> u64 {
        self.inner.counts.read().unwrap().transactions
    }

    /// Number of closure transactions that committed
    pub fn commit_count(&self) -> u64 {
        self.inner.counts.read().unwrap().commits
    }

    /// Number of closure transactions that rolled back
    pub fn rollback_count(&self) -> u64 {
        self.inner.counts.read().unwrap().rollbacks
    }

    /// Forget the call counts; recorded transactions stay.
    pub fn mock_clear(&self) {
        *self.inner.counts.write().unwrap() = ClientCounts::default();
    }

    /// Forget counts and recorded transactions.
    pub fn mock_reset(&self) {
        self.mock_clear();
        self.inner.transactions.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_commits_on_success() {
        let client = ClientStub::new();
        let result: Result<i32, &str> = client.transaction(|_| Ok(42));

        assert_eq!(result, Ok(42));
        assert_eq!(client.commit_count(), 1);
        assert_eq!(client.rollback_count(), 0);
        assert!(client.transactions()[0].is_committed());
    }

    #[test]
    fn test_transaction_rolls_back_on_failure() {
        let client = ClientStub::new();
        let result: Result<i32, &str> = client.transaction(|_| Err("boom"));

        assert_eq!(result, Err("boom"));
        assert_eq!(client.rollback_count(), 1);
        assert!(client.transactions()[0].is_rolled_back());
    }

    #[test]
    fn test_manual_transactions_start_pending() {
        let client = ClientStub::new();
        let tx = client.begin();

        assert_eq!(tx.state(), TransactionState::Pending);
        tx.commit();
        assert!(tx.is_committed());
        assert_eq!(client.transaction_count(), 1);
    }

    #[test]
    fn test_mock_clear_keeps_transactions() {
        let client = ClientStub::new();
        let _: Result<(), &str> = client.transaction(|_| Ok(()));

        client.mock_clear();
        assert_eq!(client.commit_count(), 0);
        assert_eq!(client.transactions().len(), 1);
    }

    #[test]
    fn test_mock_reset_forgets_transactions() {
        let client = ClientStub::new();
        let _: Result<(), &str> = client.transaction(|_| Ok(()));

        client.mock_reset();
        assert_eq!(client.transaction_count(), 0);
        assert!(client.transactions().is_empty());
    }
}
