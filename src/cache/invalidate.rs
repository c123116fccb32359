//! Mutation-driven cache patching.
//!
//! The store holds denormalized listing responses (paginated transaction pages
//! and per-employee transaction lists) that embed copies of the same record.
//! After a mutation every cached copy is patched in place, so unrelated cached
//! data survives. Each mutation kind has its own hand-written patch rule.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::key::cache_key;
use super::storage::{CacheStorage, CachedEntry};
use crate::api::endpoint::RegisteredEndpoint;

/// Approval flag change on a single transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalChange {
  pub transaction_id: String,
  pub employee_id: String,
  pub value: bool,
}

/// Payload describing a mutation that cached entries may be stale against.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
  TransactionApproval(ApprovalChange),
}

/// Keys touched by one invalidation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvalidationReport {
  /// Entries that held the mutated record and were rewritten
  pub patched: Vec<String>,
  /// Entries that matched the listing filter but had an unexpected shape
  pub skipped: Vec<String>,
}

/// Patch every cached copy of the record changed by `event`.
///
/// Only acts when `endpoint` is the mutation endpoint that produces `event`;
/// anything else leaves the store untouched.
pub fn invalidate(
  storage: &dyn CacheStorage,
  endpoint: RegisteredEndpoint,
  event: &MutationEvent,
) -> Result<InvalidationReport> {
  match (endpoint, event) {
    (RegisteredEndpoint::SetTransactionApproval, MutationEvent::TransactionApproval(change)) => {
      patch_transaction_approval(storage, change)
    }
    _ => {
      tracing::debug!(%endpoint, "no cache patch rule for endpoint");
      Ok(InvalidationReport::default())
    }
  }
}

fn patch_transaction_approval(
  storage: &dyn CacheStorage,
  change: &ApprovalChange,
) -> Result<InvalidationReport> {
  let mut report = InvalidationReport::default();
  let listing_marker = RegisteredEndpoint::PaginatedTransactions.as_str();
  let employee_key = cache_key(
    RegisteredEndpoint::TransactionsByEmployee,
    Some(&json!({ "employeeId": change.employee_id })),
  );

  for key in storage.keys()? {
    if !key.contains(listing_marker) {
      continue;
    }
    patch_entry(storage, &key, change, &mut report, |payload| {
      payload.get_mut("data").and_then(Value::as_array_mut)
    })?;
  }

  patch_entry(storage, &employee_key, change, &mut report, Value::as_array_mut)?;

  tracing::info!(
    transaction_id = %change.transaction_id,
    approved = change.value,
    patched = report.patched.len(),
    "patched cached transactions"
  );
  Ok(report)
}

/// Set `approved` on the first item of the list picked by `list_of` whose id
/// matches. The entry is patched under the store's lock, so a concurrent clear
/// never sees it written back.
fn patch_entry<F>(
  storage: &dyn CacheStorage,
  key: &str,
  change: &ApprovalChange,
  report: &mut InvalidationReport,
  list_of: F,
) -> Result<()>
where
  F: Fn(&mut Value) -> Option<&mut Vec<Value>>,
{
  let mut malformed = false;
  let patched = storage.update(key, &mut |entry: &mut CachedEntry| {
    let Some(items) = list_of(&mut entry.payload) else {
      malformed = true;
      return false;
    };

    let found = items
      .iter_mut()
      .find(|item| item.get("id").and_then(Value::as_str) == Some(change.transaction_id.as_str()));

    match found {
      Some(Value::Object(item)) => {
        item.insert("approved".to_string(), Value::Bool(change.value));
        true
      }
      _ => false,
    }
  })?;

  if malformed {
    tracing::warn!(%key, "cached entry is not a transaction listing, skipping");
    report.skipped.push(key.to_string());
  }
  if patched {
    report.patched.push(key.to_string());
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::{CachedEntry, MemoryStorage, NoopStorage};

  const PAGE_KEY: &str = r#"paginatedTransactions@{"page":1}"#;
  const EMPLOYEE_KEY: &str = r#"transactionsByEmployee@{"employeeId":"e1"}"#;

  fn approval_of_t1() -> MutationEvent {
    MutationEvent::TransactionApproval(ApprovalChange {
      transaction_id: "t1".into(),
      employee_id: "e1".into(),
      value: true,
    })
  }

  fn approve_t1(storage: &dyn CacheStorage) -> InvalidationReport {
    invalidate(storage, RegisteredEndpoint::SetTransactionApproval, &approval_of_t1()).unwrap()
  }

  fn store(storage: &MemoryStorage, key: &str, payload: Value) {
    storage.set(key, CachedEntry::new(payload)).unwrap();
  }

  fn payload(storage: &MemoryStorage, key: &str) -> Value {
    storage.get(key).unwrap().unwrap().payload
  }

  #[test]
  fn test_patches_paginated_entry() {
    let storage = MemoryStorage::new();
    store(
      &storage,
      PAGE_KEY,
      json!({ "data": [{ "id": "t1", "approved": false }], "nextPage": 2 }),
    );

    let report = approve_t1(&storage);

    assert_eq!(report.patched, vec![PAGE_KEY]);
    assert_eq!(
      payload(&storage, PAGE_KEY),
      json!({ "data": [{ "id": "t1", "approved": true }], "nextPage": 2 })
    );
  }

  #[test]
  fn test_patches_employee_list_entry() {
    let storage = MemoryStorage::new();
    store(
      &storage,
      PAGE_KEY,
      json!({ "data": [{ "id": "t1", "approved": false }] }),
    );
    store(
      &storage,
      EMPLOYEE_KEY,
      json!([{ "id": "t0", "approved": false }, { "id": "t1", "approved": false }]),
    );

    let report = approve_t1(&storage);

    assert_eq!(report.patched.len(), 2);
    assert_eq!(
      payload(&storage, EMPLOYEE_KEY),
      json!([{ "id": "t0", "approved": false }, { "id": "t1", "approved": true }])
    );
  }

  #[test]
  fn test_missing_transaction_leaves_store_untouched() {
    let storage = MemoryStorage::new();
    let page = json!({ "data": [{ "id": "t7", "approved": false }] });
    let list = json!([{ "id": "t7", "approved": false }]);
    store(&storage, PAGE_KEY, page.clone());
    store(&storage, EMPLOYEE_KEY, list.clone());
    let cached_at = storage.get(PAGE_KEY).unwrap().unwrap().cached_at;

    let report = approve_t1(&storage);

    assert!(report.patched.is_empty());
    assert_eq!(payload(&storage, PAGE_KEY), page);
    assert_eq!(payload(&storage, EMPLOYEE_KEY), list);
    assert_eq!(storage.get(PAGE_KEY).unwrap().unwrap().cached_at, cached_at);
  }

  #[test]
  fn test_other_employee_list_is_not_patched() {
    let storage = MemoryStorage::new();
    let other = r#"transactionsByEmployee@{"employeeId":"e2"}"#;
    store(&storage, other, json!([{ "id": "t1", "approved": false }]));

    approve_t1(&storage);

    assert_eq!(payload(&storage, other), json!([{ "id": "t1", "approved": false }]));
  }

  #[test]
  fn test_non_listing_entries_are_ignored() {
    let storage = MemoryStorage::new();
    let employees = json!([{ "id": "t1", "approved": false }]);
    store(&storage, "employees", employees.clone());

    approve_t1(&storage);

    assert_eq!(payload(&storage, "employees"), employees);
  }

  #[test]
  fn test_malformed_entry_is_skipped() {
    let storage = MemoryStorage::new();
    let broken = r#"paginatedTransactions@{"page":0}"#;
    store(&storage, broken, json!("not a page"));
    store(
      &storage,
      PAGE_KEY,
      json!({ "data": [{ "id": "t1", "approved": false }] }),
    );

    let report = approve_t1(&storage);

    assert_eq!(report.skipped, vec![broken]);
    assert_eq!(report.patched, vec![PAGE_KEY]);
    assert_eq!(payload(&storage, broken), json!("not a page"));
  }

  #[test]
  fn test_only_first_matching_item_is_patched() {
    let storage = MemoryStorage::new();
    store(
      &storage,
      PAGE_KEY,
      json!({ "data": [{ "id": "t1", "approved": false }, { "id": "t1", "approved": false }] }),
    );

    approve_t1(&storage);

    assert_eq!(
      payload(&storage, PAGE_KEY),
      json!({ "data": [{ "id": "t1", "approved": true }, { "id": "t1", "approved": false }] })
    );
  }

  #[test]
  fn test_other_endpoints_do_nothing() {
    let storage = MemoryStorage::new();
    let page = json!({ "data": [{ "id": "t1", "approved": false }] });
    store(&storage, PAGE_KEY, page.clone());

    let report = invalidate(&storage, RegisteredEndpoint::Employees, &approval_of_t1()).unwrap();

    assert_eq!(report, InvalidationReport::default());
    assert_eq!(payload(&storage, PAGE_KEY), page);
  }

  #[test]
  fn test_without_store_is_noop() {
    let report = approve_t1(&NoopStorage);
    assert_eq!(report, InvalidationReport::default());
  }
}
