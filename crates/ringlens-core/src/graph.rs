//! Transaction graph model.
//!
//! A directed multigraph over accounts:
//! - Nodes are accounts (the union of all sender and receiver ids)
//! - Edges are individual transactions, kept verbatim (self-loops and
//!   parallel edges included, never deduplicated)
//! - Per-account adjacency holds transaction indexes in insertion order;
//!   time-sorted views are produced lazily on demand

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::models::Transaction;

/// Index of a transaction in the graph's backing store.
pub type TxnIdx = usize;

/// Directed multigraph of accounts and transactions.
#[derive(Debug, Clone)]
pub struct TransactionGraph {
    /// Backing store; adjacency lists hold indexes into this vector.
    transactions: Vec<Transaction>,
    /// Account -> outgoing transaction indexes, insertion order.
    outgoing: HashMap<String, Vec<TxnIdx>>,
    /// Account -> incoming transaction indexes, insertion order.
    incoming: HashMap<String, Vec<TxnIdx>>,
    /// Transaction id -> index.
    by_id: HashMap<String, TxnIdx>,
    /// All account ids, sorted ascending.
    accounts: Vec<String>,
}

impl TransactionGraph {
    /// Builds the graph from a batch of validated transactions.
    ///
    /// Every transaction is appended exactly once to its sender's outgoing
    /// list and exactly once to its receiver's incoming list. Fails on an
    /// empty batch; the engine produces no partial report.
    pub fn build(transactions: Vec<Transaction>) -> EngineResult<Self> {
        if transactions.is_empty() {
            return Err(EngineError::EmptyInput);
        }

        let mut outgoing: HashMap<String, Vec<TxnIdx>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<TxnIdx>> = HashMap::new();
        let mut by_id: HashMap<String, TxnIdx> = HashMap::with_capacity(transactions.len());

        for (idx, txn) in transactions.iter().enumerate() {
            if !txn.amount.is_finite() || txn.amount < 0.0 {
                return Err(EngineError::invalid_transaction(
                    &txn.transaction_id,
                    format!("non-finite or negative amount {}", txn.amount),
                ));
            }
            outgoing.entry(txn.sender_id.clone()).or_default().push(idx);
            incoming
                .entry(txn.receiver_id.clone())
                .or_default()
                .push(idx);
            by_id.insert(txn.transaction_id.clone(), idx);
        }

        let mut accounts: Vec<String> = outgoing.keys().chain(incoming.keys()).cloned().collect();
        accounts.sort_unstable();
        accounts.dedup();

        Ok(Self {
            transactions,
            outgoing,
            incoming,
            by_id,
            accounts,
        })
    }

    /// All account ids, sorted ascending.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Number of accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of transactions.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// All transactions in input order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transaction at a given index.
    pub fn txn(&self, idx: TxnIdx) -> &Transaction {
        &self.transactions[idx]
    }

    /// Looks up a transaction by id.
    pub fn get(&self, transaction_id: &str) -> Option<&Transaction> {
        self.by_id.get(transaction_id).map(|&idx| &self.transactions[idx])
    }

    /// Outgoing transaction indexes for an account, insertion order.
    pub fn outgoing(&self, account: &str) -> &[TxnIdx] {
        self.outgoing.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming transaction indexes for an account, insertion order.
    pub fn incoming(&self, account: &str) -> &[TxnIdx] {
        self.incoming.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outgoing transactions for an account, insertion order.
    pub fn outgoing_txns<'a>(&'a self, account: &str) -> impl Iterator<Item = &'a Transaction> {
        self.outgoing(account).iter().map(|&idx| &self.transactions[idx])
    }

    /// Incoming transactions for an account, insertion order.
    pub fn incoming_txns<'a>(&'a self, account: &str) -> impl Iterator<Item = &'a Transaction> {
        self.incoming(account).iter().map(|&idx| &self.transactions[idx])
    }

    /// Outgoing transactions sorted by timestamp.
    pub fn outgoing_sorted(&self, account: &str) -> Vec<&Transaction> {
        let mut txns: Vec<&Transaction> = self.outgoing_txns(account).collect();
        txns.sort_by_key(|t| t.ts_millis());
        txns
    }

    /// Incoming transactions sorted by timestamp.
    pub fn incoming_sorted(&self, account: &str) -> Vec<&Transaction> {
        let mut txns: Vec<&Transaction> = self.incoming_txns(account).collect();
        txns.sort_by_key(|t| t.ts_millis());
        txns
    }

    /// All of an account's transactions (incoming and outgoing) sorted by
    /// timestamp. A self-loop contributes two events, one per direction.
    pub fn events_sorted(&self, account: &str) -> Vec<&Transaction> {
        let mut txns: Vec<&Transaction> = self
            .outgoing_txns(account)
            .chain(self.incoming_txns(account))
            .collect();
        txns.sort_by_key(|t| t.ts_millis());
        txns
    }

    /// Out-degree (number of outgoing transactions).
    pub fn out_degree(&self, account: &str) -> usize {
        self.outgoing(account).len()
    }

    /// In-degree (number of incoming transactions).
    pub fn in_degree(&self, account: &str) -> usize {
        self.incoming(account).len()
    }

    /// Total degree (in + out).
    pub fn degree(&self, account: &str) -> usize {
        self.out_degree(account) + self.in_degree(account)
    }
}
