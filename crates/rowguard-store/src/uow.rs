//! Units of work: the transaction-scoped handle every statement runs on.
//!
//! A unit of work owns its principal, its session context (current tenant),
//! its buffered writes, and one connection slot. Statements see committed
//! rows overlaid with the unit's own pending writes, filtered by each table's
//! tenant policy. Dropping the handle without `commit` discards everything.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::policy::PolicyDecision;
use rowguard_core::{AccessScope, Principal, StatementKind, TenantId};

use crate::catalog::{Filter, Row, RowId, Table, Values, CREATED_AT, UPDATED_AT};
use crate::context::SessionContext;
use crate::pool::Slot;
use crate::store::Store;

/// Pending writes against one table.
#[derive(Debug, Default)]
struct TableDelta {
    upserts: BTreeMap<RowId, Row>,
    // ids created by this unit of work (absent from committed rows)
    inserted: BTreeSet<RowId>,
    deleted: BTreeSet<RowId>,
    // committed image of every pre-existing row this unit touched, as first read
    read: BTreeMap<RowId, Row>,
}

impl TableDelta {
    fn insert(&mut self, row: Row) {
        self.inserted.insert(row.id);
        self.upserts.insert(row.id, row);
    }

    /// Keep the committed image of a row the first time it is touched.
    fn remember(&mut self, committed: &BTreeMap<RowId, Row>, id: RowId) {
        if let Some(row) = committed.get(&id) {
            self.read.entry(id).or_insert_with(|| row.clone());
        }
    }

    fn upsert(&mut self, row: Row) {
        self.upserts.insert(row.id, row);
    }

    fn delete(&mut self, id: RowId) {
        self.upserts.remove(&id);
        if !self.inserted.remove(&id) {
            self.deleted.insert(id);
        }
    }

    fn len(&self) -> usize {
        self.upserts.len() + self.deleted.len()
    }

    fn apply_to(&self, rows: &mut BTreeMap<RowId, Row>) {
        for id in &self.deleted {
            rows.remove(id);
        }
        for (id, row) in &self.upserts {
            rows.insert(*id, row.clone());
        }
    }
}

pub struct UnitOfWork {
    id: u64,
    store: Store,
    principal: Principal,
    session: SessionContext,
    pending: BTreeMap<String, TableDelta>,
    finished: bool,
    span: tracing::Span,
    _slot: Slot,
}

impl UnitOfWork {
    pub(crate) fn new(store: Store, principal: Principal, slot: Slot) -> Self {
        let id = store.next_uow_id();
        let span = tracing::debug_span!("uow", id, role = %principal.role());
        store.metrics().units_of_work_active.inc(&[]);
        span.in_scope(|| tracing::debug!(privileged = principal.is_privileged(), "unit of work started"));
        Self {
            id,
            store,
            principal,
            session: SessionContext::new(),
            pending: BTreeMap::new(),
            finished: false,
            span,
            _slot: slot,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Bind the current tenant for the rest of this unit of work.
    /// Re-binding the same tenant is a no-op.
    pub fn set_current_tenant(&mut self, tenant: TenantId) {
        let _e = self.span.enter();
        let shown = tenant.to_string();
        if self.session.set_current_tenant(tenant) {
            tracing::debug!(tenant = %shown, "current tenant bound");
        }
    }

    pub fn reset_current_tenant(&mut self) {
        self.session.reset();
    }

    pub fn current_tenant(&self) -> Option<&TenantId> {
        self.session.current_tenant()
    }

    pub fn scope(&self) -> AccessScope<'_> {
        self.session.scope(&self.principal)
    }

    /// Number of buffered row writes.
    pub fn pending_writes(&self) -> usize {
        self.pending.values().map(TableDelta::len).sum()
    }

    pub fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>> {
        let res = self.select_inner(table, filter);
        self.finish_statement(table, StatementKind::Select, &res);
        res
    }

    /// Returns the new row's id. Rejected with `PolicyViolation` when the
    /// row's tenant is not the current tenant.
    pub fn insert(&mut self, table: &str, values: Values) -> Result<RowId> {
        let res = self.insert_inner(table, values);
        self.finish_statement(table, StatementKind::Insert, &res);
        res
    }

    /// Returns the number of rows updated. Rows outside the scope are not
    /// matched; moving a row out of the scope fails the whole statement.
    pub fn update(&mut self, table: &str, filter: &Filter, patch: Values) -> Result<u64> {
        let res = self.update_inner(table, filter, patch);
        self.finish_statement(table, StatementKind::Update, &res);
        res
    }

    /// Returns the number of rows deleted. Rows outside the scope are not matched.
    pub fn delete(&mut self, table: &str, filter: &Filter) -> Result<u64> {
        let res = self.delete_inner(table, filter);
        self.finish_statement(table, StatementKind::Delete, &res);
        res
    }

    /// Apply all buffered writes atomically.
    pub fn commit(mut self) -> Result<()> {
        let _e = self.span.clone().entered();
        let res = self.apply();
        self.finished = true;
        match &res {
            Ok(rows) => {
                self.store.metrics().commits.inc(&[("outcome", "committed")]);
                tracing::debug!(rows, "unit of work committed");
            }
            Err(e) => {
                self.store.metrics().commits.inc(&[("outcome", "conflict")]);
                tracing::warn!(error = %e, "commit failed, nothing applied");
            }
        }
        res.map(|_| ())
    }

    /// Discard buffered writes and the session context.
    pub fn rollback(self) {
        drop(self);
    }

    fn select_inner(&self, table: &str, filter: &Filter) -> Result<Vec<Row>> {
        let t = self.store.catalog().get(table)?;
        filter.validate(&t.def)?;

        let policy = t.policy.for_statement(self.scope());
        let mut out = Vec::new();
        let mut filtered = 0u64;
        for row in self.working_rows(&t)?.into_values() {
            if !policy.using(&row).is_pass() {
                filtered += 1;
                continue;
            }
            if filter.matches(&row) {
                out.push(row);
            }
        }
        self.count_filtered(table, filtered);
        Ok(out)
    }

    fn insert_inner(&mut self, table: &str, mut values: Values) -> Result<RowId> {
        let t = self.store.catalog().get(table)?;
        check_columns(&t, &values)?;
        check_tenant_value(&t, &values)?;
        if t.def.timestamps {
            let now = now_value();
            values.insert(CREATED_AT.to_string(), now.clone());
            values.insert(UPDATED_AT.to_string(), now);
        }

        let decision = t.policy.for_statement(self.scope()).with_check(&values);
        reject_on_violation(&t, StatementKind::Insert, decision)?;

        let id = self.store.next_row_id();
        self.delta(table).insert(Row { id, values });
        Ok(id)
    }

    fn update_inner(&mut self, table: &str, filter: &Filter, patch: Values) -> Result<u64> {
        let t = self.store.catalog().get(table)?;
        filter.validate(&t.def)?;
        check_columns(&t, &patch)?;

        let committed = t.snapshot()?;
        let rows = self.overlay(&t, committed.clone());
        let now = t.def.timestamps.then(now_value);
        let mut changed = Vec::new();
        let mut filtered = 0u64;
        {
            let policy = t.policy.for_statement(self.scope());
            for row in rows.into_values() {
                if !policy.using(&row).is_pass() {
                    filtered += 1;
                    continue;
                }
                if !filter.matches(&row) {
                    continue;
                }
                let mut new = row;
                for (k, v) in &patch {
                    new.values.insert(k.clone(), v.clone());
                }
                if let Some(now) = &now {
                    new.values.insert(UPDATED_AT.to_string(), now.clone());
                }
                check_tenant_value(&t, &new.values)?;
                reject_on_violation(&t, StatementKind::Update, policy.with_check(&new.values))?;
                changed.push(new);
            }
        }
        self.count_filtered(table, filtered);

        let n = changed.len() as u64;
        let delta = self.delta(table);
        for row in changed {
            delta.remember(&committed, row.id);
            delta.upsert(row);
        }
        Ok(n)
    }

    fn delete_inner(&mut self, table: &str, filter: &Filter) -> Result<u64> {
        let t = self.store.catalog().get(table)?;
        filter.validate(&t.def)?;

        let committed = t.snapshot()?;
        let rows = self.overlay(&t, committed.clone());
        let mut victims = Vec::new();
        let mut filtered = 0u64;
        {
            let policy = t.policy.for_statement(self.scope());
            for row in rows.values() {
                if !policy.using(row).is_pass() {
                    filtered += 1;
                    continue;
                }
                if filter.matches(row) {
                    victims.push(row.id);
                }
            }
        }
        self.count_filtered(table, filtered);

        let n = victims.len() as u64;
        let delta = self.delta(table);
        for id in victims {
            delta.remember(&committed, id);
            delta.delete(id);
        }
        Ok(n)
    }

    /// Committed rows overlaid with this unit's pending writes.
    fn working_rows(&self, t: &Table) -> Result<BTreeMap<RowId, Row>> {
        Ok(self.overlay(t, t.snapshot()?))
    }

    fn overlay(&self, t: &Table, mut rows: BTreeMap<RowId, Row>) -> BTreeMap<RowId, Row> {
        if let Some(delta) = self.pending.get(t.name()) {
            delta.apply_to(&mut rows);
        }
        rows
    }

    fn delta(&mut self, table: &str) -> &mut TableDelta {
        self.pending.entry(table.to_string()).or_default()
    }

    fn apply(&mut self) -> Result<usize> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(0);
        }

        // BTreeMap order == table name order == lock order for every commit
        let tables = pending
            .into_iter()
            .map(|(name, delta)| Ok((self.store.catalog().get(&name)?, delta)))
            .collect::<Result<Vec<(Arc<Table>, TableDelta)>>>()?;

        let mut guards = Vec::with_capacity(tables.len());
        for (t, _) in &tables {
            guards.push(t.write_rows()?);
        }

        // Every row this unit read must still be the image it read, and still
        // be in scope. Otherwise a concurrent commit changed or removed it.
        let scope = self.scope();
        for ((t, delta), rows) in tables.iter().zip(guards.iter()) {
            let policy = t.policy.for_statement(scope);
            for (id, seen) in &delta.read {
                let unchanged = rows
                    .get(id)
                    .is_some_and(|now| now == seen && policy.using(now).is_pass());
                if !unchanged {
                    return Err(RowGuardError::Conflict(format!(
                        "row {id} in table {} was changed by a concurrent unit of work",
                        t.name()
                    )));
                }
            }
        }

        let mut written = 0;
        for ((_, delta), rows) in tables.iter().zip(guards.iter_mut()) {
            written += delta.len();
            delta.apply_to(rows);
        }
        Ok(written)
    }

    fn count_filtered(&self, table: &str, n: u64) {
        self.store.metrics().rows_filtered.add(&[("table", table)], n);
    }

    fn finish_statement<T>(&self, table: &str, op: StatementKind, res: &Result<T>) {
        let metrics = self.store.metrics();
        // caller-supplied names only become labels once they resolve
        let table = match res {
            Err(RowGuardError::UnknownTable(_)) => UNKNOWN_TABLE_LABEL,
            _ => table,
        };
        match res {
            Ok(_) => metrics.statement(table, op.as_str(), "ok"),
            Err(e) if e.is_policy_violation() => {
                metrics.statement(table, op.as_str(), "violation");
                metrics
                    .policy_violations
                    .inc(&[("table", table), ("op", op.as_str())]);
                let _e = self.span.enter();
                tracing::warn!(table, %op, scope = self.scope().kind(), "row security policy violation");
            }
            Err(e) => {
                metrics.statement(table, op.as_str(), "error");
                let _e = self.span.enter();
                tracing::debug!(table, %op, error = %e, "statement failed");
            }
        }
    }
}

/// Metrics label for statements against undefined tables.
const UNKNOWN_TABLE_LABEL: &str = "(unknown)";

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            let _e = self.span.enter();
            self.store.metrics().commits.inc(&[("outcome", "rolled_back")]);
            tracing::debug!(discarded = self.pending_writes(), "unit of work rolled back");
        }
        self.store.metrics().units_of_work_active.dec(&[]);
    }
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn check_columns(t: &Table, values: &Values) -> Result<()> {
    for col in values.keys() {
        if !t.def.has_column(col) {
            return Err(RowGuardError::UnknownColumn {
                table: t.name().to_string(),
                column: col.clone(),
            });
        }
        if t.def.timestamps && (col == CREATED_AT || col == UPDATED_AT) {
            return Err(RowGuardError::BadRequest(format!(
                "column {col} of table {} is maintained by the store",
                t.name()
            )));
        }
    }
    Ok(())
}

/// The tenant column is NOT NULL and holds a well-formed tenant id,
/// whoever writes the row.
fn check_tenant_value(t: &Table, values: &Values) -> Result<()> {
    let Some(col) = t.tenant_column() else { return Ok(()) };
    match values.get(col) {
        None | Some(Value::Null) => Err(RowGuardError::NotNull {
            table: t.name().to_string(),
            column: col.to_string(),
        }),
        Some(Value::String(s)) => TenantId::parse(s.as_str()).map(|_| ()),
        Some(_) => Err(RowGuardError::BadRequest(format!(
            "column {col} of table {} must be a string",
            t.name()
        ))),
    }
}

fn reject_on_violation(t: &Table, op: StatementKind, decision: PolicyDecision) -> Result<()> {
    match decision {
        PolicyDecision::Reject { msg, .. } => Err(RowGuardError::PolicyViolation {
            table: t.name().to_string(),
            op,
            reason: msg,
        }),
        PolicyDecision::Pass | PolicyDecision::Filter => Ok(()),
    }
}
