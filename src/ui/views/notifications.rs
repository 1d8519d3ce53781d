use crate::platform::types::{Notification, Page};
use crate::ui::renderfns::{relative_time, truncate};
use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw_notifications(
  frame: &mut Frame,
  area: Rect,
  notifications: &Page<Notification>,
  unread: Option<u64>,
  selected: usize,
  loading: bool,
) {
  let title = if loading {
    " Notifications (loading...) ".to_string()
  } else {
    match unread {
      Some(count) => format!(" Notifications ({} unread) ", count),
      None => format!(" Notifications ({}) ", notifications.total_elements),
    }
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if notifications.content.is_empty() && !loading {
    let paragraph = Paragraph::new("No notifications.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let now = Utc::now();
  let items: Vec<ListItem> = notifications
    .content
    .iter()
    .map(|notification| {
      let (bullet, message_style) = if notification.read {
        ("  ", Style::default().fg(Color::DarkGray))
      } else {
        ("● ", Style::default().fg(Color::White))
      };

      let line = Line::from(vec![
        Span::styled(bullet, Style::default().fg(Color::Cyan)),
        Span::styled(
          format!("{:<60}", truncate(&notification.message, 58)),
          message_style,
        ),
        Span::styled(
          relative_time(notification.created_at, now),
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
