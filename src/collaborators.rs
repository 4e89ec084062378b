//! Interfaces to the systems a search depends on.
//!
//! datasolr does not own the relational store, the schema source or the
//! permission system; hosts plug them in through these traits.

use datasolr_query::{FieldCatalog, SearchRequest};
use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, Result};
use crate::extension::SearchContext;

/// One row returned by the relational store, keyed by column name.
pub type Row = Map<String, Value>;

/// Source of resource schemas.
#[allow(async_fn_in_trait)]
pub trait FieldCatalogProvider {
    /// Resolve an alias to the name of its source table.
    ///
    /// Implementations return [`ErrorKind::NotFound`] for unknown
    /// resources; a plain table name resolves to itself.
    async fn resolve_alias(&self, resource_id: &str) -> Result<String>;

    /// Fields of `resource_id`, in table order.
    async fn get_fields(&self, resource_id: &str) -> Result<FieldCatalog>;
}

/// Executes fetch statements against the relational store.
#[allow(async_fn_in_trait)]
pub trait RowExecutor {
    /// Run `sql`, binding `values` to its `%s` placeholders in order.
    async fn execute(&self, sql: &str, values: &[Value]) -> Result<Vec<Row>>;

    /// Release the underlying connection.
    fn close(&self);
}

/// Permission check run before a search touches any backend.
pub trait AccessCheck: Send + Sync {
    /// Fail with [`ErrorKind::Authorization`] to refuse `action`.
    fn check_access(&self, action: &str, context: &SearchContext, request: &SearchRequest)
        -> Result<()>;
}

/// Access check that lets everything through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessCheck for AllowAll {
    fn check_access(&self, _action: &str, _context: &SearchContext, _request: &SearchRequest) -> Result<()> {
        Ok(())
    }
}

/// Access check that refuses anonymous callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireUser;

impl AccessCheck for RequireUser {
    fn check_access(&self, action: &str, context: &SearchContext, request: &SearchRequest) -> Result<()> {
        match context.user.as_deref() {
            Some(user) if !user.is_empty() => Ok(()),
            _ => Err(Error::new(ErrorKind::Authorization(format!(
                "{} on {} requires a user",
                action, request.resource_id
            )))),
        }
    }
}

/// Holds a [`RowExecutor`] and closes it exactly once, at the latest when
/// the guard is dropped.
pub(crate) struct ConnectionGuard<E: RowExecutor> {
    executor: E,
    closed: bool,
}

impl<E: RowExecutor> ConnectionGuard<E> {
    pub(crate) fn new(executor: E) -> Self {
        Self {
            executor,
            closed: false,
        }
    }

    pub(crate) fn executor(&self) -> &E {
        &self.executor
    }

    pub(crate) fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.executor.close();
        }
    }
}

impl<E: RowExecutor> Drop for ConnectionGuard<E> {
    fn drop(&mut self) {
        self.close();
    }
}
