mod components;
mod renderfns;
mod views;

use crate::app::{App, Mode, ViewState};
use crate::event::ToastLevel;
use ratatui::prelude::*;
use ratatui::widgets::{Clear, Paragraph};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app);

  // Draw current view
  if let Some(view) = app.current_view() {
    match view {
      ViewState::BlogList {
        page,
        blogs,
        selected,
        loading,
      } => {
        views::blogs::draw_blog_list(frame, chunks[1], blogs, *page, *selected, *loading);
      }
      ViewState::Notifications {
        notifications,
        selected,
        loading,
        ..
      } => {
        views::notifications::draw_notifications(
          frame,
          chunks[1],
          notifications,
          app.unread(),
          *selected,
          *loading,
        );
      }
      ViewState::Homebrew {
        entries,
        selected,
        loading,
        ..
      } => {
        views::homebrew::draw_homebrew(frame, chunks[1], entries, *selected, *loading);
      }
      ViewState::AuthRequired { email } => {
        views::auth::draw_auth_required(frame, chunks[1], email);
      }
      ViewState::BlogDetail {
        slug,
        blog,
        comments,
        selected_comment,
        loading,
      } => {
        views::blog_detail::draw_blog_detail(
          frame,
          chunks[1],
          slug,
          blog.as_deref(),
          comments,
          *selected_comment,
          *loading,
        );
      }
    }
  }

  // Command/search overlay with autocomplete
  match app.mode() {
    Mode::Command => {
      components::command_overlay::draw_command_overlay(
        frame,
        chunks[1],
        ":",
        app.command_input(),
        &app.autocomplete_suggestions(),
        app.selected_suggestion(),
      );
    }
    Mode::Search => {
      components::command_overlay::draw_command_overlay(
        frame,
        chunks[1],
        "/",
        app.search_filter(),
        &[],
        0,
      );
    }
    _ => {}
  }

  draw_toasts(frame, chunks[1], app);

  // Draw status bar
  draw_status_bar(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
  let breadcrumb = app.view_breadcrumb().join(" > ");
  let left = Paragraph::new(Line::from(vec![
    Span::styled(" tavern ", Style::default().fg(Color::Black).bg(Color::Yellow)),
    Span::raw(" "),
    Span::styled(breadcrumb, Style::default().fg(Color::White)),
  ]));
  frame.render_widget(left, area);

  let mut right = Vec::new();
  if let Some(count) = app.unread() {
    if count > 0 {
      right.push(Span::styled(
        format!("🔔 {} ", count),
        Style::default().fg(Color::Cyan),
      ));
    }
  }
  match app.username() {
    Some(username) => right.push(Span::styled(
      format!("{} @ {} ", username, app.title()),
      Style::default().fg(Color::DarkGray),
    )),
    None => right.push(Span::styled(
      format!("logged out @ {} ", app.title()),
      Style::default().fg(Color::DarkGray),
    )),
  }

  let right_para = Paragraph::new(Line::from(right)).alignment(Alignment::Right);
  frame.render_widget(right_para, area);
}

/// Toasts stack bottom-up over the content area, newest closest to the
/// status bar.
fn draw_toasts(frame: &mut Frame, area: Rect, app: &App) {
  let toasts: Vec<_> = app.toasts().collect();
  for (i, toast) in toasts.iter().rev().take(3).enumerate() {
    let y = area.bottom().saturating_sub(1 + i as u16);
    if y < area.y {
      break;
    }
    let line_area = Rect::new(area.x, y, area.width, 1);

    let style = match toast.level {
      ToastLevel::Info => Style::default().fg(Color::Black).bg(Color::Green),
      ToastLevel::Error => Style::default().fg(Color::White).bg(Color::Red),
    };

    frame.render_widget(Clear, line_area);
    let paragraph = Paragraph::new(format!(" {} ", toast.message)).style(style);
    frame.render_widget(paragraph, line_area);
  }
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Normal => {
      let hint = " :command  /search  j/k:nav  Enter:open  l:like  a:archive  c:comment  m:read  n/p:page  r:refresh  q:back";
      (hint.to_string(), Style::default().fg(Color::DarkGray))
    }
    Mode::Command => {
      let cmd = format!(":{}", app.command_input());
      (cmd, Style::default().fg(Color::Yellow))
    }
    Mode::Search => {
      let search = format!("/{}", app.search_filter());
      (search, Style::default().fg(Color::Cyan))
    }
    Mode::Compose => {
      let draft = format!("comment> {}", app.compose_input());
      (draft, Style::default().fg(Color::Green))
    }
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}
