//! In-memory API that serves the registered endpoints from a fixture dataset.
//!
//! Used when no HTTP backend is configured, and by the tests to count how
//! often the cache layer actually reaches the transport.

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::endpoint::RegisteredEndpoint;
use super::transport::Transport;
use super::types::{Employee, PaginatedResponse, Transaction};

/// Page size of the `paginatedTransactions` endpoint.
pub const TRANSACTIONS_PER_PAGE: usize = 5;

/// Employees and transactions served by the fixture API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
  #[serde(default)]
  pub employees: Vec<Employee>,
  #[serde(default)]
  pub transactions: Vec<Transaction>,
}

impl Dataset {
  /// Load a dataset from a YAML (or JSON) file.
  pub fn load(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read fixture file {}: {}", path.display(), e))?;

    serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse fixture file {}: {}", path.display(), e))
  }

  /// Small built-in dataset: three employees, twelve transactions.
  pub fn sample() -> Self {
    let employees = vec![
      employee("e1", "James", "Smith"),
      employee("e2", "Mary", "Johnson"),
      employee("e3", "Robert", "Williams"),
    ];

    let merchants = [
      "Social Media Ads Inc",
      "Cloud Storage Co",
      "Office Supplies Depot",
      "Airline Tickets Ltd",
    ];

    let transactions = (0..12)
      .map(|i| Transaction {
        id: format!("t{}", i + 1),
        amount: 100.0 + (i as f64) * 37.25,
        employee: employees[i % employees.len()].clone(),
        merchant: merchants[i % merchants.len()].to_string(),
        date: format!("2024-03-{:02}", i + 1),
        approved: i % 3 == 0,
      })
      .collect();

    Self {
      employees,
      transactions,
    }
  }
}

fn employee(id: &str, first_name: &str, last_name: &str) -> Employee {
  Employee {
    id: id.to_string(),
    first_name: first_name.to_string(),
    last_name: last_name.to_string(),
  }
}

/// Transport backed by an in-memory [`Dataset`].
pub struct FixtureTransport {
  dataset: Mutex<Dataset>,
  latency: Duration,
  requests: AtomicUsize,
}

impl FixtureTransport {
  pub fn new(dataset: Dataset) -> Self {
    Self {
      dataset: Mutex::new(dataset),
      latency: Duration::ZERO,
      requests: AtomicUsize::new(0),
    }
  }

  /// Delay every response by `latency`.
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  /// Number of requests received so far.
  pub fn request_count(&self) -> usize {
    self.requests.load(Ordering::SeqCst)
  }

  fn handle(&self, endpoint: RegisteredEndpoint, params: Option<&Value>) -> Result<Value> {
    let mut dataset = self
      .dataset
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let response = match endpoint {
      RegisteredEndpoint::Employees => serde_json::to_value(&dataset.employees)?,
      RegisteredEndpoint::PaginatedTransactions => {
        let page = param(params, "page")
          .and_then(Value::as_u64)
          .ok_or_else(|| eyre!("Page cannot be null"))?;

        serde_json::to_value(paginate(&dataset.transactions, page)?)?
      }
      RegisteredEndpoint::TransactionsByEmployee => {
        let employee_id = param(params, "employeeId")
          .and_then(Value::as_str)
          .filter(|id| !id.is_empty())
          .ok_or_else(|| eyre!("Employee id cannot be empty"))?;

        let transactions: Vec<&Transaction> = dataset
          .transactions
          .iter()
          .filter(|t| t.employee.id == employee_id)
          .collect();
        serde_json::to_value(transactions)?
      }
      RegisteredEndpoint::SetTransactionApproval => {
        let transaction_id = param(params, "transactionId").and_then(Value::as_str);
        let value = param(params, "value")
          .and_then(Value::as_bool)
          .ok_or_else(|| eyre!("Approval value must be a boolean"))?;

        let transaction = dataset
          .transactions
          .iter_mut()
          .find(|t| Some(t.id.as_str()) == transaction_id)
          .ok_or_else(|| eyre!("Invalid transaction to approve"))?;
        transaction.approved = value;
        Value::Null
      }
    };

    Ok(response)
  }
}

impl Transport for FixtureTransport {
  fn fetch<'a>(
    &'a self,
    endpoint: RegisteredEndpoint,
    params: Option<&'a Value>,
  ) -> BoxFuture<'a, Result<Value>> {
    async move {
      self.requests.fetch_add(1, Ordering::SeqCst);
      tracing::debug!(%endpoint, "fixture request");

      if !self.latency.is_zero() {
        tokio::time::sleep(self.latency).await;
      }
      self.handle(endpoint, params)
    }
    .boxed()
  }
}

fn param<'a>(params: Option<&'a Value>, name: &str) -> Option<&'a Value> {
  params.and_then(|p| p.get(name))
}

fn paginate(transactions: &[Transaction], page: u64) -> Result<PaginatedResponse<Transaction>> {
  let start = usize::try_from(page)
    .ok()
    .and_then(|p| p.checked_mul(TRANSACTIONS_PER_PAGE))
    .filter(|start| *start <= transactions.len())
    .ok_or_else(|| eyre!("Invalid page {}", page))?;

  let end = (start + TRANSACTIONS_PER_PAGE).min(transactions.len());
  let next_page = if end < transactions.len() {
    Some(u32::try_from(page + 1)?)
  } else {
    None
  };

  Ok(PaginatedResponse {
    data: transactions[start..end].to_vec(),
    next_page,
  })
}
