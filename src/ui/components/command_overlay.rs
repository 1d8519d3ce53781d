use crate::commands::Command;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Floating palette for `:` commands and `/` filters, anchored under the
/// header. Suggestion rows show the command, its aliases, and what it does.
pub fn draw_command_overlay(
  frame: &mut Frame,
  area: Rect,
  prefix: &str,
  input: &str,
  suggestions: &[&Command],
  selected_suggestion: usize,
) {
  if area.width < 8 || area.height < 3 {
    return;
  }

  let (title, accent) = if prefix == "/" {
    (" Search ", Color::Cyan)
  } else {
    (" Command ", Color::Yellow)
  };

  let width = area.width.saturating_sub(4).min(52);
  // One bordered prompt line plus as many suggestion rows as fit
  let rows = suggestions.len().min(area.height.saturating_sub(4) as usize) as u16;
  let height = (3 + rows).min(area.height);
  let x = area.x + (area.width - width) / 2;
  let overlay = Rect::new(x, area.y + 1, width, height);

  frame.render_widget(Clear, overlay);

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(accent));
  let inner = block.inner(overlay);
  frame.render_widget(block, overlay);
  if inner.height == 0 {
    return;
  }

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(1), Constraint::Min(0)])
    .split(inner);

  let prompt = Paragraph::new(Line::from(vec![
    Span::styled(prefix.to_string(), Style::default().fg(accent)),
    Span::raw(input.to_string()),
    Span::styled("█", Style::default().fg(accent)),
  ]));
  frame.render_widget(prompt, chunks[0]);

  if rows == 0 || chunks[1].height == 0 {
    return;
  }

  let items: Vec<ListItem> = suggestions
    .iter()
    .take(rows as usize)
    .map(|cmd| {
      let mut spans = vec![Span::styled(
        format!("{:<14}", cmd.name),
        Style::default().fg(Color::Cyan),
      )];
      if !cmd.aliases.is_empty() {
        spans.push(Span::styled(
          format!("({}) ", cmd.aliases.join(", ")),
          Style::default().fg(Color::DarkGray),
        ));
      }
      spans.push(Span::raw(cmd.description));
      ListItem::new(Line::from(spans))
    })
    .collect();

  let list = List::new(items)
    .highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected_suggestion));
  frame.render_stateful_widget(list, chunks[1], &mut state);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands;
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;

  fn rendered(prefix: &str, input: &str, suggestions: &[&Command]) -> String {
    let mut terminal = Terminal::new(TestBackend::new(60, 14)).unwrap();
    terminal
      .draw(|frame| draw_command_overlay(frame, frame.area(), prefix, input, suggestions, 0))
      .unwrap();
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect()
  }

  #[test]
  fn test_overlay_lists_matching_commands_with_aliases() {
    let suggestions = commands::get_suggestions("blo");
    let screen = rendered(":", "blo", &suggestions);
    assert!(screen.contains("blogs"));
    assert!(screen.contains("(b, blog)"));
  }

  #[test]
  fn test_search_overlay_shows_the_typed_filter() {
    let screen = rendered("/", "dragon", &[]);
    assert!(screen.contains("Search"));
    assert!(screen.contains("/dragon"));
  }
}
