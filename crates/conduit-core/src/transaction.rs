//! Transactions spanning independently-owned storages.
//!
//! Endpoints apply their mutation immediately and register an undo action
//! with the open [`Transaction`]. [`Transaction::commit`] forgets the undo
//! journal; [`Transaction::abort`] (or dropping the transaction while open)
//! replays it newest-first, restoring every participant to its state before
//! the transaction opened.
//!
//! Evaluation is single-threaded and a tick runs to completion, so staged
//! changes are never observed by anything outside the tick that made them.

use crate::id::TxId;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TX: AtomicU64 = AtomicU64::new(1);

type UndoFn = Box<dyn FnOnce()>;

/// An open outer transaction. Consumed by `commit` or `abort`.
pub struct Transaction {
    id: TxId,
    journal: Vec<UndoFn>,
    open: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("journal_len", &self.journal.len())
            .field("open", &self.open)
            .finish()
    }
}

impl Transaction {
    pub fn open() -> Self {
        Self {
            id: TxId(NEXT_TX.fetch_add(1, Ordering::Relaxed)),
            journal: Vec::new(),
            open: true,
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    /// Register the action that reverts a mutation already applied.
    pub fn on_abort(&mut self, undo: impl FnOnce() + 'static) {
        self.journal.push(Box::new(undo));
    }

    /// Number of staged mutations.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Keep every staged mutation.
    pub fn commit(mut self) {
        self.journal.clear();
        self.open = false;
    }

    /// Revert every staged mutation.
    pub fn abort(mut self) {
        self.rollback();
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.journal.pop() {
            undo();
        }
        self.open = false;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.open {
            self.rollback();
        }
    }
}

/// Run `f` inside a fresh transaction that is always aborted.
///
/// Used for read-ahead: the closure may extract freely to learn what a
/// storage would yield, and nothing it does survives.
pub fn probe<R>(f: impl FnOnce(&mut Transaction) -> R) -> R {
    let mut tx = Transaction::open();
    let result = f(&mut tx);
    tx.abort();
    result
}
