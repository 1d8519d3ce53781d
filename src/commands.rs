/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "blogs",
    aliases: &["b", "blog"],
    description: "Browse community blog posts",
  },
  Command {
    name: "notifications",
    aliases: &["n", "notif", "inbox"],
    description: "View your notifications",
  },
  Command {
    name: "homebrew",
    aliases: &["h", "brew"],
    description: "Browse the homebrew catalog",
  },
  Command {
    name: "login",
    aliases: &["auth"],
    description: "Sign in to the platform",
  },
  Command {
    name: "logout",
    aliases: &[],
    description: "Sign out and clear the stored session",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch the current view from the server",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit tavern",
  },
];

impl Command {
  /// Rank this command against palette input; lower sorts first, `None`
  /// drops the command from the suggestion list.
  fn rank(&self, input: &str) -> Option<u8> {
    if self.name == input {
      return Some(0);
    }
    if self.aliases.contains(&input) {
      return Some(1);
    }
    if self.name.starts_with(input) {
      return Some(2);
    }
    if self.aliases.iter().any(|a| a.starts_with(input)) {
      return Some(3);
    }
    if self.name.contains(input) {
      return Some(4);
    }
    self.aliases.iter().any(|a| a.contains(input)).then_some(5)
  }
}

/// Rank the palette against the typed input. Exact hits sort ahead of
/// prefix hits, prefix hits ahead of substring hits, and within each tier
/// a name beats an alias; the stable sort keeps table order after that.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut ranked: Vec<(u8, &Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| cmd.rank(&input).map(|rank| (rank, cmd)))
    .collect();
  ranked.sort_by_key(|(rank, _)| *rank);
  ranked.into_iter().map(|(_, cmd)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("blogs");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "blogs");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("n");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "notifications");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("notif");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "notifications");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("fresh");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "refresh");
  }

  #[test]
  fn test_exact_alias_outranks_prefix_alias() {
    // "b" is an exact alias of blogs and a prefix of homebrew's "brew"
    let suggestions = get_suggestions("b");
    assert_eq!(suggestions[0].name, "blogs");
    assert!(suggestions.iter().any(|c| c.name == "homebrew"));
  }

  #[test]
  fn test_unknown_input_yields_nothing() {
    assert!(get_suggestions("xyzzy").is_empty());
  }
}
