use chrono::{DateTime, Utc};

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
  }
}

/// Compact relative timestamp for list rows
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let elapsed = now - then;

  if elapsed.num_seconds() < 60 {
    "just now".to_string()
  } else if elapsed.num_minutes() < 60 {
    format!("{}m ago", elapsed.num_minutes())
  } else if elapsed.num_hours() < 24 {
    format!("{}h ago", elapsed.num_hours())
  } else if elapsed.num_days() < 30 {
    format!("{}d ago", elapsed.num_days())
  } else {
    then.format("%Y-%m-%d").to_string()
  }
}
