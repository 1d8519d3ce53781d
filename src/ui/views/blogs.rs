use crate::platform::types::{BlogSummary, Page};
use crate::ui::renderfns::{relative_time, truncate};
use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw_blog_list(
  frame: &mut Frame,
  area: Rect,
  blogs: &Page<BlogSummary>,
  page: u32,
  selected: usize,
  loading: bool,
) {
  let title = if loading {
    " Blogs (loading...) ".to_string()
  } else {
    format!(
      " Blogs (page {}/{}, {} posts) ",
      page + 1,
      blogs.total_pages.max(1),
      blogs.total_elements
    )
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if blogs.content.is_empty() && !loading {
    let paragraph = Paragraph::new("No blog posts.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let now = Utc::now();
  let items: Vec<ListItem> = blogs
    .content
    .iter()
    .map(|blog| {
      let title_style = if blog.archived {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
      } else {
        Style::default().fg(Color::White)
      };

      let line = Line::from(vec![
        Span::styled(format!("{:<44}", truncate(&blog.title, 42)), title_style),
        Span::raw(" "),
        Span::styled(
          format!("{:<14}", truncate(&blog.author, 14)),
          Style::default().fg(Color::Cyan),
        ),
        Span::styled(
          format!("♥ {:<5}", blog.like_count),
          Style::default().fg(Color::Red),
        ),
        Span::styled(
          format!("🗨 {:<5}", blog.comment_count),
          Style::default().fg(Color::Yellow),
        ),
        Span::styled(
          relative_time(blog.created_at, now),
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
