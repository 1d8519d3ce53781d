use crate::platform::types::{HomebrewSummary, Page};
use crate::ui::renderfns::{relative_time, truncate};
use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw_homebrew(
  frame: &mut Frame,
  area: Rect,
  entries: &Page<HomebrewSummary>,
  selected: usize,
  loading: bool,
) {
  let title = if loading {
    " Homebrew (loading...) ".to_string()
  } else {
    format!(" Homebrew ({} entries) ", entries.total_elements)
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if entries.content.is_empty() && !loading {
    let paragraph = Paragraph::new("The homebrew catalog is empty.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let now = Utc::now();
  let items: Vec<ListItem> = entries
    .content
    .iter()
    .map(|entry| {
      let line = Line::from(vec![
        Span::styled(
          format!("{:<36}", truncate(&entry.name, 34)),
          Style::default().fg(Color::White),
        ),
        Span::styled(
          format!("{:<16}", truncate(&entry.category, 14)),
          Style::default().fg(Color::Magenta),
        ),
        Span::styled(
          format!("{:<14}", truncate(&entry.author, 14)),
          Style::default().fg(Color::Cyan),
        ),
        Span::styled(
          relative_time(entry.created_at, now),
          Style::default().fg(Color::DarkGray),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected));

  frame.render_stateful_widget(list, area, &mut state);
}
