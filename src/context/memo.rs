//! Resolve-once slots for lazily computed context state.

use crate::error::ContextError;
use std::cell::OnceCell;

/// Observable state of a [`Memo`].
#[derive(Debug, PartialEq)]
pub enum MemoState<'a, T> {
    Unresolved,
    Resolved(&'a T),
    Failed(&'a ContextError),
}

/// A value computed on first access. Failures are cached too, so a broken store or missing
/// target is reported identically on every access without retrying.
#[derive(Debug)]
pub struct Memo<T> {
    cell: OnceCell<Result<T, ContextError>>,
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get_or_resolve<F>(&self, resolve: F) -> Result<&T, ContextError>
    where
        F: FnOnce() -> Result<T, ContextError>,
    {
        self.cell.get_or_init(resolve).as_ref().map_err(Clone::clone)
    }

    pub fn state(&self) -> MemoState<'_, T> {
        match self.cell.get() {
            None => MemoState::Unresolved,
            Some(Ok(value)) => MemoState::Resolved(value),
            Some(Err(err)) => MemoState::Failed(err),
        }
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}
