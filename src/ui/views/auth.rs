use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

pub fn draw_auth_required(frame: &mut Frame, area: Rect, email: &str) {
  let block = Block::default()
    .title(" Sign in ")
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Yellow));

  let lines = vec![
    Line::from(""),
    Line::from(Span::styled(
      "You are not signed in.",
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from(vec![
      Span::raw("Press "),
      Span::styled("Enter", Style::default().fg(Color::Yellow)),
      Span::raw(" to sign in as "),
      Span::styled(email, Style::default().fg(Color::Cyan)),
    ]),
    Line::from(""),
    Line::from(Span::styled(
      "The password is read from the TAVERN_PASSWORD environment variable.",
      Style::default().fg(Color::DarkGray),
    )),
  ];

  let paragraph = Paragraph::new(lines)
    .block(block)
    .alignment(Alignment::Center);
  frame.render_widget(paragraph, area);
}
