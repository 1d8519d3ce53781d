use crate::platform::types::{BlogDetail, Comment};
use crate::ui::renderfns::relative_time;
use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

pub fn draw_blog_detail(
  frame: &mut Frame,
  area: Rect,
  slug: &str,
  blog: Option<&BlogDetail>,
  comments: &[Comment],
  selected_comment: usize,
  loading: bool,
) {
  let title = if loading {
    format!(" {} (loading...) ", slug)
  } else {
    format!(" {} ", slug)
  };

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let inner = block.inner(area);
  frame.render_widget(block, area);

  let blog = match blog {
    Some(blog) => blog,
    None => {
      let paragraph =
        Paragraph::new("Loading post...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }
  };

  // Layout: header, separator, body, comments
  let comment_height = (comments.len() as u16 + 2).min(inner.height / 3).max(3);
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(3),              // Title, author, reactions
      Constraint::Length(1),              // Separator
      Constraint::Min(1),                 // Body
      Constraint::Length(comment_height), // Comments
    ])
    .split(inner);

  let now = Utc::now();

  // Header
  let like_label = if blog.liked {
    format!("♥ {} (liked)", blog.like_count)
  } else {
    format!("♡ {}", blog.like_count)
  };
  let mut status_spans = vec![
    Span::styled("By ", Style::default().fg(Color::DarkGray)),
    Span::styled(&blog.author, Style::default().fg(Color::Cyan)),
    Span::styled(
      format!(", {}", relative_time(blog.created_at, now)),
      Style::default().fg(Color::DarkGray),
    ),
    Span::raw("  "),
    Span::styled(like_label, Style::default().fg(Color::Red)),
  ];
  if blog.archived {
    status_spans.push(Span::raw("  "));
    status_spans.push(Span::styled(
      "[archived]",
      Style::default().fg(Color::Yellow),
    ));
  }

  let header = vec![
    Line::from(Span::styled(
      &blog.title,
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(status_spans),
  ];
  frame.render_widget(Paragraph::new(header), chunks[0]);

  // Separator
  let sep =
    Paragraph::new("─".repeat(chunks[1].width as usize)).style(Style::default().fg(Color::DarkGray));
  frame.render_widget(sep, chunks[1]);

  // Body
  let body = Paragraph::new(blog.body.as_str()).wrap(Wrap { trim: true });
  frame.render_widget(body, chunks[2]);

  // Comments
  draw_comments(frame, chunks[3], comments, selected_comment);
}

fn draw_comments(frame: &mut Frame, area: Rect, comments: &[Comment], selected: usize) {
  let block = Block::default()
    .title(format!(" Comments ({}) ", comments.len()))
    .borders(Borders::TOP)
    .border_style(Style::default().fg(Color::DarkGray));

  if comments.is_empty() {
    let paragraph = Paragraph::new("No comments yet. Press 'c' to write one.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let now = Utc::now();
  let items: Vec<ListItem> = comments
    .iter()
    .map(|comment| {
      // A provisional comment has no server id yet
      let marker = if comment.id == 0 { "…" } else { " " };
      let line = Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Yellow)),
        Span::styled(
          format!("{:<14}", comment.author),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(comment.body.clone()),
        Span::styled(
          format!("  {}", relative_time(comment.created_at, now)),
          Style::default().fg(Color::DarkGray),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected));

  frame.render_stateful_widget(list, area, &mut state);
}
