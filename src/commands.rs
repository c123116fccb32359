//! Shell commands, parsing and autocomplete logic
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;

use crate::api::endpoint::RegisteredEndpoint;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "employees",
    aliases: &["e", "emp"],
    usage: "employees",
    description: "List employees (cached)",
  },
  Command {
    name: "page",
    aliases: &["p", "transactions"],
    usage: "page <n>",
    description: "Show a page of transactions (cached)",
  },
  Command {
    name: "employee",
    aliases: &["by"],
    usage: "employee <id>",
    description: "Show transactions of one employee (cached)",
  },
  Command {
    name: "approve",
    aliases: &["a", "set"],
    usage: "approve <transaction> <employee> <true|false>",
    description: "Set a transaction's approval and patch cached listings",
  },
  Command {
    name: "get",
    aliases: &["g"],
    usage: "get <endpoint> [json params]",
    description: "Raw read-through fetch of any endpoint",
  },
  Command {
    name: "fresh",
    aliases: &["f", "nocache"],
    usage: "fresh <endpoint> [json params]",
    description: "Raw fetch that bypasses the cache",
  },
  Command {
    name: "keys",
    aliases: &["k", "ls"],
    usage: "keys",
    description: "List cache keys",
  },
  Command {
    name: "clear",
    aliases: &["c"],
    usage: "clear [endpoint...]",
    description: "Clear the whole cache, or only the given endpoints",
  },
  Command {
    name: "status",
    aliases: &["s"],
    usage: "status",
    description: "Show cache and loading state",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "Show this help",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit reqcache",
  },
];

/// A parsed shell line
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
  Employees,
  Page(u32),
  Employee(String),
  Approve {
    transaction_id: String,
    employee_id: String,
    value: bool,
  },
  Get {
    endpoint: RegisteredEndpoint,
    params: Option<Value>,
  },
  Fresh {
    endpoint: RegisteredEndpoint,
    params: Option<Value>,
  },
  Keys,
  /// Empty list clears everything
  Clear(Vec<RegisteredEndpoint>),
  Status,
  Help,
  Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ShellCommand>> {
  let (word, rest) = split_word(line.trim());
  if word.is_empty() {
    return Ok(None);
  }

  let command = resolve(word)?;
  let args: Vec<&str> = rest.split_whitespace().collect();

  let parsed = match command.name {
    "employees" => ShellCommand::Employees,
    "page" => {
      let page = args
        .first()
        .ok_or_else(|| usage_error(command))?
        .parse()
        .map_err(|e| eyre!("Invalid page number: {}", e))?;
      ShellCommand::Page(page)
    }
    "employee" => {
      let employee_id = args.first().ok_or_else(|| usage_error(command))?;
      ShellCommand::Employee(employee_id.to_string())
    }
    "approve" => match args.as_slice() {
      [transaction_id, employee_id, value] => ShellCommand::Approve {
        transaction_id: transaction_id.to_string(),
        employee_id: employee_id.to_string(),
        value: value
          .parse()
          .map_err(|_| eyre!("Approval value must be true or false, got '{}'", value))?,
      },
      _ => return Err(usage_error(command)),
    },
    "get" | "fresh" => {
      let (endpoint, params) = split_word(rest);
      if endpoint.is_empty() {
        return Err(usage_error(command));
      }
      let endpoint: RegisteredEndpoint = endpoint.parse()?;
      let params = if params.is_empty() {
        None
      } else {
        Some(serde_json::from_str(params).map_err(|e| eyre!("Invalid JSON params: {}", e))?)
      };

      if command.name == "get" {
        ShellCommand::Get { endpoint, params }
      } else {
        ShellCommand::Fresh { endpoint, params }
      }
    }
    "keys" => ShellCommand::Keys,
    "clear" => ShellCommand::Clear(
      args
        .iter()
        .map(|a| a.parse())
        .collect::<Result<Vec<RegisteredEndpoint>>>()?,
    ),
    "status" => ShellCommand::Status,
    "help" => ShellCommand::Help,
    "quit" => ShellCommand::Quit,
    other => return Err(eyre!("Command '{}' is not wired up", other)),
  };

  Ok(Some(parsed))
}

/// Find the command named (or aliased) by `word`.
fn resolve(word: &str) -> Result<&'static Command> {
  let word = word.to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == word || cmd.aliases.contains(&word.as_str()))
    .ok_or_else(|| {
      let suggestions: Vec<&str> = get_suggestions(&word).iter().map(|c| c.name).collect();
      if suggestions.is_empty() {
        eyre!("Unknown command '{}'. Type 'help' for a list.", word)
      } else {
        eyre!(
          "Unknown command '{}'. Did you mean: {}?",
          word,
          suggestions.join(", ")
        )
      }
    })
}

fn usage_error(command: &Command) -> color_eyre::Report {
  eyre!("Usage: {}", command.usage)
}

fn split_word(input: &str) -> (&str, &str) {
  match input.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (input, ""),
  }
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    if cmd.name == input_lower {
      matches.push((cmd, 0));
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
    } else if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
    } else if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_prefix_suggestion() {
    let suggestions = get_suggestions("emp");
    assert_eq!(suggestions[0].name, "employees");
    assert!(suggestions.iter().any(|c| c.name == "employee"));
  }

  #[test]
  fn test_fuzzy_suggestion() {
    let suggestions = get_suggestions("prov");
    assert_eq!(suggestions[0].name, "approve");
  }

  #[test]
  fn test_blank_line() {
    assert_eq!(parse("   ").unwrap(), None);
  }

  #[test]
  fn test_alias() {
    assert_eq!(parse("p 2").unwrap(), Some(ShellCommand::Page(2)));
    assert_eq!(parse("Q").unwrap(), Some(ShellCommand::Quit));
  }

  #[test]
  fn test_approve() {
    assert_eq!(
      parse("approve t3 e1 false").unwrap(),
      Some(ShellCommand::Approve {
        transaction_id: "t3".into(),
        employee_id: "e1".into(),
        value: false,
      })
    );
    assert!(parse("approve t3 e1 maybe").is_err());
    assert!(parse("approve t3").is_err());
  }

  #[test]
  fn test_get_with_json_params() {
    assert_eq!(
      parse(r#"get transactionsByEmployee {"employeeId": "e2"}"#).unwrap(),
      Some(ShellCommand::Get {
        endpoint: RegisteredEndpoint::TransactionsByEmployee,
        params: Some(json!({ "employeeId": "e2" })),
      })
    );
    assert_eq!(
      parse("fresh employees").unwrap(),
      Some(ShellCommand::Fresh {
        endpoint: RegisteredEndpoint::Employees,
        params: None,
      })
    );
    assert!(parse("get employees {oops").is_err());
  }

  #[test]
  fn test_clear() {
    assert_eq!(parse("clear").unwrap(), Some(ShellCommand::Clear(Vec::new())));
    assert_eq!(
      parse("clear paginatedTransactions employees").unwrap(),
      Some(ShellCommand::Clear(vec![
        RegisteredEndpoint::PaginatedTransactions,
        RegisteredEndpoint::Employees,
      ]))
    );
    assert!(parse("clear nothing").is_err());
  }

  #[test]
  fn test_unknown_command_suggests() {
    let err = parse("employe").unwrap_err().to_string();
    assert!(err.contains("Did you mean: employees, employee?"), "{}", err);
  }
}
