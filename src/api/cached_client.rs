//! Typed client over the cache layer for the approvals API.

use color_eyre::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
  ApprovalChange, CacheLayer, CacheResult, CacheStorage, InvalidationReport, MemoryStorage,
  MutationEvent,
};
use crate::config::{Config, TransportConfig};

use super::client::HttpTransport;
use super::endpoint::RegisteredEndpoint;
use super::fixture::{Dataset, FixtureTransport};
use super::transport::Transport;
use super::types::{
  Employee, EmployeeRequestParams, PaginatedRequestParams, PaginatedResponse, Transaction,
};

/// Approvals API client with transparent caching.
///
/// Reads go through the read-through cache. The approval mutation always hits
/// the transport and then patches every cached copy of the transaction.
#[derive(Clone)]
pub struct ApprovalsClient {
  cache: CacheLayer,
}

impl ApprovalsClient {
  pub fn new(cache: CacheLayer) -> Self {
    Self { cache }
  }

  /// Build the transport and store described by the configuration.
  pub fn from_config(config: &Config) -> Result<Self> {
    let transport: Arc<dyn Transport> = match &config.transport {
      TransportConfig::Fixture {
        fixtures,
        latency_ms,
      } => {
        let dataset = match fixtures {
          Some(path) => Dataset::load(path)?,
          None => Dataset::sample(),
        };
        Arc::new(FixtureTransport::new(dataset).with_latency(Duration::from_millis(*latency_ms)))
      }
      TransportConfig::Http {
        base_url,
        timeout_secs,
      } => Arc::new(HttpTransport::new(
        base_url,
        timeout_secs.map(Duration::from_secs),
      )?),
    };

    let cache = if config.cache.enabled {
      let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
      CacheLayer::new(transport, storage)
    } else {
      tracing::info!("cache disabled, all requests go to the transport");
      CacheLayer::without_store(transport)
    };

    Ok(Self::new(cache))
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  pub fn loading(&self) -> bool {
    self.cache.loading()
  }

  /// Get all employees with caching.
  pub async fn employees(&self) -> Result<CacheResult<Vec<Employee>>> {
    self
      .cache
      .fetch(RegisteredEndpoint::Employees, None::<&Value>)
      .await
  }

  /// Get one page of transactions with caching.
  pub async fn paginated_transactions(
    &self,
    page: u32,
  ) -> Result<CacheResult<PaginatedResponse<Transaction>>> {
    let params = PaginatedRequestParams { page };
    self
      .cache
      .fetch(RegisteredEndpoint::PaginatedTransactions, Some(&params))
      .await
  }

  /// Get all transactions of one employee with caching.
  pub async fn transactions_by_employee(
    &self,
    employee_id: &str,
  ) -> Result<CacheResult<Vec<Transaction>>> {
    let params = EmployeeRequestParams {
      employee_id: employee_id.to_string(),
    };
    self
      .cache
      .fetch(RegisteredEndpoint::TransactionsByEmployee, Some(&params))
      .await
  }

  /// Set the approval flag of a transaction (not cached - write operation).
  ///
  /// Cached listings are patched only after the transport accepted the change.
  pub async fn set_transaction_approval(
    &self,
    change: ApprovalChange,
  ) -> Result<InvalidationReport> {
    let endpoint = RegisteredEndpoint::SetTransactionApproval;
    let _: Value = self.cache.fetch_without_cache(endpoint, Some(&change)).await?;

    self
      .cache
      .update_cache_when_checked(endpoint, &MutationEvent::TransactionApproval(change))
  }
}
