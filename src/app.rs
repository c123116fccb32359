use crate::api::cached_client::ApprovalsClient;
use crate::api::types::{Employee, Transaction};
use crate::cache::{ApprovalChange, CacheResult};
use crate::commands::{self, ShellCommand, COMMANDS};
use color_eyre::Result;
use serde_json::Value;
use std::fmt::Write as _;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

const PROMPT: &str = "reqcache> ";

/// Main application state
pub struct App {
  /// Cached API client
  client: ApprovalsClient,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(client: ApprovalsClient) -> Self {
    Self {
      client,
      should_quit: false,
    }
  }

  /// Read commands from stdin until `quit` or end of input.
  pub async fn run(&mut self) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type 'help' for a list of commands.");
    while !self.should_quit {
      print!("{}", PROMPT);
      std::io::stdout().flush()?;

      let Some(line) = lines.next_line().await? else {
        break;
      };

      match self.handle_line(&line).await {
        Ok(output) if output.is_empty() => {}
        Ok(output) => println!("{}", output),
        Err(e) => println!("error: {}", e),
      }
    }

    Ok(())
  }

  /// Parse and execute one line, returning what should be printed.
  pub async fn handle_line(&mut self, line: &str) -> Result<String> {
    match commands::parse(line)? {
      Some(command) => self.execute(command).await,
      None => Ok(String::new()),
    }
  }

  async fn execute(&mut self, command: ShellCommand) -> Result<String> {
    tracing::debug!(?command, "executing");
    let cache = self.client.cache();

    let output = match command {
      ShellCommand::Employees => {
        let result = self.client.employees().await?;
        with_source(&result, render_employees(&result.data))
      }
      ShellCommand::Page(page) => {
        let result = self.client.paginated_transactions(page).await?;
        let mut out = render_transactions(&result.data.data);
        match result.data.next_page {
          Some(next) => write!(out, "\nnext page: {}", next)?,
          None => write!(out, "\nlast page")?,
        }
        with_source(&result, out)
      }
      ShellCommand::Employee(employee_id) => {
        let result = self.client.transactions_by_employee(&employee_id).await?;
        with_source(&result, render_transactions(&result.data))
      }
      ShellCommand::Approve {
        transaction_id,
        employee_id,
        value,
      } => {
        let report = self
          .client
          .set_transaction_approval(ApprovalChange {
            transaction_id: transaction_id.clone(),
            employee_id,
            value,
          })
          .await?;

        let mut out = format!(
          "{} {}; patched {} cached entr{}",
          transaction_id,
          if value { "approved" } else { "unapproved" },
          report.patched.len(),
          if report.patched.len() == 1 { "y" } else { "ies" }
        );
        for key in &report.skipped {
          write!(out, "\nskipped malformed entry {}", key)?;
        }
        out
      }
      ShellCommand::Get { endpoint, params } => {
        let result: CacheResult<Value> = cache.fetch(endpoint, params.as_ref()).await?;
        with_source(&result, serde_json::to_string_pretty(&result.data)?)
      }
      ShellCommand::Fresh { endpoint, params } => {
        let data: Value = cache.fetch_without_cache(endpoint, params.as_ref()).await?;
        serde_json::to_string_pretty(&data)?
      }
      ShellCommand::Keys => {
        let keys = cache.cache_keys()?;
        if keys.is_empty() {
          "(cache is empty)".to_string()
        } else {
          keys.join("\n")
        }
      }
      ShellCommand::Clear(endpoints) if endpoints.is_empty() => {
        cache.clear_cache()?;
        "cache cleared".to_string()
      }
      ShellCommand::Clear(endpoints) => {
        let removed = cache.clear_cache_by_endpoint(&endpoints)?;
        format!("removed {} entries", removed)
      }
      ShellCommand::Status => format!(
        "cache: {}\nentries: {}\nloading: {}",
        if cache.is_cache_enabled() { "enabled" } else { "disabled" },
        cache.cache_keys()?.len(),
        self.client.loading()
      ),
      ShellCommand::Help => render_help(),
      ShellCommand::Quit => {
        self.should_quit = true;
        String::new()
      }
    };

    Ok(output)
  }
}

fn with_source<T>(result: &CacheResult<T>, body: String) -> String {
  match result.cached_at.filter(|_| result.is_hit()) {
    Some(cached_at) => format!(
      "{}\n[{}, cached at {}]",
      body,
      result.source,
      cached_at.format("%H:%M:%S")
    ),
    None => format!("{}\n[{}]", body, result.source),
  }
}

fn render_employees(employees: &[Employee]) -> String {
  employees
    .iter()
    .map(|e| format!("{:<6} {}", e.id, e.full_name()))
    .collect::<Vec<_>>()
    .join("\n")
}

fn render_transactions(transactions: &[Transaction]) -> String {
  if transactions.is_empty() {
    return "(no transactions)".to_string();
  }

  transactions
    .iter()
    .map(|t| {
      format!(
        "[{}] {:<6} {:>10.2}  {:<24} {:<18} {}",
        if t.approved { "x" } else { " " },
        t.id,
        t.amount,
        t.merchant,
        t.employee.full_name(),
        t.date
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

fn render_help() -> String {
  COMMANDS
    .iter()
    .map(|c| format!("{:<48} {}", c.usage, c.description))
    .collect::<Vec<_>>()
    .join("\n")
}
