//! Incremental updates.
//!
//! A [`Transaction`] patches the row tree in place: removes first, then
//! updates, then adds. Every touched group is recorded on a
//! [`ChangedPath`] so the downstream stages only revisit those groups.
//! Items that reference unknown rows are dropped and reported, never
//! treated as errors.

use std::collections::VecDeque;

use horizon_grid_core::logging::targets;
use serde::{Deserialize, Serialize};

use super::changed_path::ChangedPath;
use super::context::{GridContext, GridWarning, TransactionOp};
use super::grouping::{GroupStage, is_generated_id};
use super::node::{NodeKind, NodeStore, RowKey};
use super::options::MissingUpdatePolicy;
use super::value::Record;

/// A batch of record changes.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::{Record, Transaction};
///
/// let tx = Transaction::new()
///     .with_add(Record::new().with("id", 4))
///     .with_remove(Record::new().with("id", 1))
///     .with_add_index(0);
/// assert_eq!(tx.add.len(), 1);
/// assert!(!tx.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Transaction {
    /// Records to add.
    pub add: Vec<Record>,
    /// Records to remove.
    pub remove: Vec<Record>,
    /// Replacement records for existing rows.
    pub update: Vec<Record>,
    /// Sibling position of the first added row.
    pub add_index: Option<usize>,
}

impl Transaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record to add.
    pub fn with_add(mut self, record: Record) -> Self {
        self.add.push(record);
        self
    }

    /// Adds a record to remove.
    pub fn with_remove(mut self, record: Record) -> Self {
        self.remove.push(record);
        self
    }

    /// Adds a replacement record.
    pub fn with_update(mut self, record: Record) -> Self {
        self.update.push(record);
        self
    }

    /// Inserts added rows at this sibling position.
    pub fn with_add_index(mut self, index: usize) -> Self {
        self.add_index = Some(index);
        self
    }

    /// Returns `true` if the transaction carries no items.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.update.is_empty()
    }
}

/// A row that a transaction removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedRow {
    /// Id the row had.
    pub id: String,
    /// Record the row held.
    pub data: Record,
}

/// The net effect of a transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowNodeTransaction {
    /// Ids of added rows.
    pub add: Vec<String>,
    /// Removed rows.
    pub remove: Vec<RemovedRow>,
    /// Ids of updated rows.
    pub update: Vec<String>,
    /// Items that were dropped.
    pub skipped: Vec<GridWarning>,
}

impl RowNodeTransaction {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.update.is_empty()
    }
}

/// Transactions waiting for the next flush, tagged with the data
/// generation they were queued against.
#[derive(Debug, Default)]
pub struct TransactionQueue {
    pending: VecDeque<(u64, Transaction)>,
}

impl TransactionQueue {
    /// Queues a transaction.
    pub fn push(&mut self, generation: u64, transaction: Transaction) {
        self.pending.push_back((generation, transaction));
    }

    /// Takes every queued transaction in queue order.
    pub fn drain(&mut self) -> Vec<(u64, Transaction)> {
        self.pending.drain(..).collect()
    }

    /// Number of queued transactions.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Applies transactions to the row tree.
pub struct TransactionProcessor<'a> {
    ctx: &'a GridContext,
    groups: GroupStage<'a>,
}

impl<'a> TransactionProcessor<'a> {
    /// Creates a processor.
    pub fn new(ctx: &'a GridContext) -> Self {
        Self {
            ctx,
            groups: GroupStage::new(ctx),
        }
    }

    /// Applies `transaction` and records touched groups on `path`.
    pub fn apply(
        &self,
        store: &mut NodeStore,
        transaction: Transaction,
        path: &mut ChangedPath,
    ) -> RowNodeTransaction {
        let mut result = RowNodeTransaction::default();
        let Transaction {
            add,
            remove,
            update,
            add_index,
        } = transaction;

        for record in remove {
            let (id, key) = self.locate(store, &record);
            match key.and_then(|k| self.groups.remove_leaf(store, k, path)) {
                Some(removed) => result.remove.push(removed),
                None => self.skip(&mut result, GridWarning::MissingRow {
                    op: TransactionOp::Remove,
                    id,
                }),
            }
        }

        for record in update {
            let (id, key) = self.locate(store, &record);
            match key {
                Some(key) => {
                    if self.groups.update_leaf(store, key, record, path).is_some() {
                        result.update.push(id);
                    }
                }
                None => match self.ctx.options.settings.missing_update_policy {
                    MissingUpdatePolicy::Add => self.add_record(store, record, None, path, &mut result),
                    MissingUpdatePolicy::Skip => self.skip(&mut result, GridWarning::MissingRow {
                        op: TransactionOp::Update,
                        id,
                    }),
                },
            }
        }

        for (offset, record) in add.into_iter().enumerate() {
            let index = add_index.map(|i| i + offset);
            self.add_record(store, record, index, path, &mut result);
        }

        tracing::debug!(
            target: targets::TRANSACTION,
            added = result.add.len(),
            removed = result.remove.len(),
            updated = result.update.len(),
            skipped = result.skipped.len(),
            changed_groups = path.len(),
            "transaction applied"
        );
        result
    }

    fn add_record(
        &self,
        store: &mut NodeStore,
        record: Record,
        index: Option<usize>,
        path: &mut ChangedPath,
        result: &mut RowNodeTransaction,
    ) {
        let id = match self.ctx.options.row_id_fn() {
            Some(row_id) => row_id(&record),
            None => store.next_auto_id(),
        };
        if is_generated_id(&id) {
            self.skip(result, GridWarning::ReservedRowId { id });
            return;
        }
        if store.contains_id(&id) {
            self.skip(result, GridWarning::DuplicateRow { id });
            return;
        }
        if self
            .groups
            .insert_leaf(store, id.clone(), record, index, path)
            .is_some()
        {
            result.add.push(id);
        }
    }

    /// Resolves the row a transaction item refers to.
    ///
    /// With a row id function the id decides. Without one, the row whose
    /// record equals the item is used.
    fn locate(&self, store: &NodeStore, record: &Record) -> (String, Option<RowKey>) {
        match self.ctx.options.row_id_fn() {
            Some(row_id) => {
                let id = row_id(record);
                let key = store
                    .key_of(&id)
                    .filter(|&k| store.get(k).is_some_and(|n| n.kind() == NodeKind::Leaf));
                (id, key)
            }
            None => store
                .iter()
                .find(|n| n.kind() == NodeKind::Leaf && n.data() == Some(record))
                .map_or_else(
                    || (serde_json::to_string(record).unwrap_or_default(), None),
                    |n| (n.id().to_string(), Some(n.key())),
                ),
        }
    }

    fn skip(&self, result: &mut RowNodeTransaction, warning: GridWarning) {
        self.ctx.warn(warning.clone());
        result.skipped.push(warning);
    }
}
