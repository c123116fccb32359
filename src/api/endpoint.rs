//! Registered endpoint identifiers shared by the cache and the transports.

use color_eyre::{eyre::eyre, Report};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of endpoints the transports know how to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegisteredEndpoint {
  Employees,
  PaginatedTransactions,
  TransactionsByEmployee,
  SetTransactionApproval,
}

impl RegisteredEndpoint {
  pub const ALL: [RegisteredEndpoint; 4] = [
    RegisteredEndpoint::Employees,
    RegisteredEndpoint::PaginatedTransactions,
    RegisteredEndpoint::TransactionsByEmployee,
    RegisteredEndpoint::SetTransactionApproval,
  ];

  /// Wire name, also used as the cache key prefix.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Employees => "employees",
      Self::PaginatedTransactions => "paginatedTransactions",
      Self::TransactionsByEmployee => "transactionsByEmployee",
      Self::SetTransactionApproval => "setTransactionApproval",
    }
  }
}

impl fmt::Display for RegisteredEndpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RegisteredEndpoint {
  type Err = Report;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|endpoint| endpoint.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| eyre!("Unknown endpoint: {}", s))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_is_case_insensitive() {
    let endpoint: RegisteredEndpoint = "paginatedtransactions".parse().unwrap();
    assert_eq!(endpoint, RegisteredEndpoint::PaginatedTransactions);
  }

  #[test]
  fn test_parse_unknown() {
    assert!("transactions".parse::<RegisteredEndpoint>().is_err());
  }

  #[test]
  fn test_serde_name_matches_wire_name() {
    for endpoint in RegisteredEndpoint::ALL {
      let json = serde_json::to_value(endpoint).unwrap();
      assert_eq!(json, serde_json::Value::String(endpoint.as_str().to_string()));
    }
  }
}
