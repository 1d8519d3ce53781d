use crate::commands::{self, Command};
use crate::config::Config;
use crate::error::{ApiError, MutationError};
use crate::event::{Event, EventHandler, PlatformEvent, SessionEvent, Toast};
use crate::platform::cached_client::CachedPlatformClient;
use crate::platform::client::PlatformClient;
use crate::platform::keys::ResourceKey;
use crate::platform::types::{BlogDetail, BlogSummary, Comment, HomebrewSummary, Notification, Page};
use crate::session::{Bootstrap, SessionStore};
use crate::ui;
use crate::{api::ApiClient, cache::ResourceCache};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How long a toast stays on screen.
const TOAST_TTL: Duration = Duration::from_secs(4);

/// Toast for a failed mutation. Auth failures are skipped: the session
/// teardown already announces those, and a second toast for the same event
/// would only repeat it.
fn mutation_toast(action: &str, err: &MutationError) -> Option<Toast> {
  if err.api_error().is_some_and(ApiError::is_auth_failure) {
    return None;
  }
  Some(Toast::error(format!("{}: {}", action, err)))
}

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
  Search,
  /// Writing a comment on the current blog post
  Compose,
}

/// View state - each variant owns its data
#[derive(Debug)]
pub enum ViewState {
  // Root views (set via : commands)
  BlogList {
    page: u32,
    blogs: Page<BlogSummary>,
    selected: usize,
    loading: bool,
  },
  Notifications {
    page: u32,
    notifications: Page<Notification>,
    selected: usize,
    loading: bool,
  },
  Homebrew {
    page: u32,
    entries: Page<HomebrewSummary>,
    selected: usize,
    loading: bool,
  },
  /// Shown when there is no session: prompts for login
  AuthRequired {
    email: String,
  },

  // Detail views (pushed via Enter)
  BlogDetail {
    slug: String,
    blog: Option<Box<BlogDetail>>,
    comments: Vec<Comment>,
    selected_comment: usize,
    loading: bool,
  },
}

impl ViewState {
  fn blog_list(page: u32) -> Self {
    ViewState::BlogList {
      page,
      blogs: Page::empty(),
      selected: 0,
      loading: true,
    }
  }

  fn notifications(page: u32) -> Self {
    ViewState::Notifications {
      page,
      notifications: Page::empty(),
      selected: 0,
      loading: true,
    }
  }

  fn homebrew(page: u32) -> Self {
    ViewState::Homebrew {
      page,
      entries: Page::empty(),
      selected: 0,
      loading: true,
    }
  }
}

impl Default for ViewState {
  fn default() -> Self {
    ViewState::blog_list(0)
  }
}

/// A toast with its display deadline.
pub struct ActiveToast {
  pub toast: Toast,
  expires_at: Instant,
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<ViewState>,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Search filter input (after pressing /)
  search_filter: String,

  /// Comment draft (after pressing c on a blog post)
  compose_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Application configuration
  config: Config,

  /// Cache-backed platform client
  client: CachedPlatformClient,

  /// Shared identity state
  session: Arc<SessionStore>,

  /// Unread notification counter for the status bar
  unread: Option<u64>,

  /// Transient user feedback
  toasts: Vec<ActiveToast>,

  /// Event source (terminal input, ticks, spawned-task results)
  events: EventHandler,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub async fn new(config: Config) -> Result<Self> {
    let events = EventHandler::new(Duration::from_millis(250));
    let event_tx = events.sender();

    let session = Arc::new(SessionStore::new(SessionStore::default_token_path()?));
    let api = ApiClient::new(&config, session.clone(), event_tx.clone())?;
    let cache = Arc::new(
      ResourceCache::new().with_stale_after(chrono::Duration::seconds(config.stale_after_secs)),
    );
    let client = CachedPlatformClient::new(PlatformClient::new(api), cache);

    Ok(Self {
      view_stack: vec![ViewState::default()],
      mode: Mode::Normal,
      command_input: String::new(),
      search_filter: String::new(),
      compose_input: String::new(),
      selected_suggestion: 0,
      config,
      client,
      session,
      unread: None,
      toasts: Vec::new(),
      events,
      event_tx,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    self.bootstrap_session();

    // Main loop
    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      let event = self.events.next().await;
      if let Some(event) = event {
        self.handle_event(event)?;
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  /// Restore the stored session, if any, and kick off the initial loads.
  fn bootstrap_session(&mut self) {
    match self.session.bootstrap() {
      Ok(Bootstrap::PendingConfirm) => {
        // Locally valid token: proceed optimistically, confirm in the
        // background. A 401 on any of these tears the session down.
        self.confirm_session();
        self.load_blogs(0);
        self.load_unread_count();
      }
      Ok(Bootstrap::NoToken) => {
        self.show_auth_required();
      }
      Ok(Bootstrap::Expired) => {
        self.show_auth_required();
        self.push_toast(Toast::info("Stored session expired, please log in"));
      }
      Err(e) => {
        self.show_auth_required();
        self.push_toast(Toast::error(format!("Could not restore session: {}", e)));
      }
    }
  }

  fn confirm_session(&self) {
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      match client.current_profile().await {
        Ok(profile) => {
          let _ = tx.send(Event::Session(SessionEvent::ProfileConfirmed(Box::new(
            profile,
          ))));
        }
        Err(e) => {
          let _ = tx.send(Event::Session(SessionEvent::BootstrapFailed(e.to_string())));
        }
      }
    });
  }

  fn show_auth_required(&mut self) {
    self.view_stack = vec![ViewState::AuthRequired {
      email: self.config.platform.email.clone(),
    }];
  }

  fn start_login(&mut self) {
    let password = match Config::get_password() {
      Ok(password) => password,
      Err(e) => {
        self.push_toast(Toast::error(e.to_string()));
        return;
      }
    };

    let client = self.client.clone();
    let email = self.config.platform.email.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      match client.login(&email, &password).await {
        Ok(response) => {
          let _ = tx.send(Event::Session(SessionEvent::LoggedIn(Box::new(
            response.user,
          ))));
        }
        Err(e) => {
          let _ = tx.send(Event::Toast(Toast::error(format!("Login failed: {}", e))));
        }
      }
    });
  }

  fn handle_event(&mut self, event: Event) -> Result<()> {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        self.expire_toasts();
        self.refresh_current_from_cache();
      }
      Event::Platform(platform_event) => self.handle_platform_event(platform_event),
      Event::Session(session_event) => self.handle_session_event(session_event),
      Event::Toast(toast) => self.push_toast(toast),
    }
    Ok(())
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
      Mode::Search => self.handle_search_mode_key(key),
      Mode::Compose => self.handle_compose_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      // Quit
      KeyCode::Char('q') => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::Enter => self.enter_selected(),
      KeyCode::Esc => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        }
      }
      KeyCode::Char('n') => self.turn_page(1),
      KeyCode::Char('p') => self.turn_page(-1),
      KeyCode::Char('r') => self.refresh_remote(),

      // Mutations on the current view
      KeyCode::Char('l') => self.toggle_like(),
      KeyCode::Char('a') => self.toggle_archive(),
      KeyCode::Char('c') => self.start_compose(),
      KeyCode::Char('d') => self.delete_selected_comment(),
      KeyCode::Char('m') => self.mark_selected_read(),
      KeyCode::Char('M') => self.mark_all_read(),

      // Mode switches
      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
      }
      KeyCode::Char('/') => {
        self.mode = Mode::Search;
        self.search_filter.clear();
      }

      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        // Navigate autocomplete suggestions
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        // Navigate autocomplete suggestions backwards
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0; // Reset selection on input change
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0; // Reset selection on input change
      }
      _ => {}
    }
  }

  fn handle_search_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.search_filter.clear();
      }
      KeyCode::Enter => {
        // Apply filter and return to normal mode
        self.mode = Mode::Normal;
      }
      KeyCode::Backspace => {
        self.search_filter.pop();
      }
      KeyCode::Char(c) => {
        self.search_filter.push(c);
      }
      _ => {}
    }
  }

  fn handle_compose_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.compose_input.clear();
      }
      KeyCode::Enter => {
        self.submit_comment();
        self.mode = Mode::Normal;
      }
      KeyCode::Backspace => {
        self.compose_input.pop();
      }
      KeyCode::Char(c) => {
        self.compose_input.push(c);
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    // Get the command to execute - either from selected suggestion or direct input
    let suggestions = commands::get_suggestions(&self.command_input);
    let cmd = if !suggestions.is_empty() && self.selected_suggestion < suggestions.len() {
      suggestions[self.selected_suggestion].name.to_string()
    } else {
      self.command_input.trim().to_lowercase()
    };

    match cmd.as_str() {
      "blogs" => {
        self.view_stack = vec![ViewState::blog_list(0)];
        self.load_blogs(0);
      }
      "notifications" => {
        self.view_stack = vec![ViewState::notifications(0)];
        self.load_notifications(0);
        self.load_unread_count();
      }
      "homebrew" => {
        self.view_stack = vec![ViewState::homebrew(0)];
        self.load_homebrew(0);
      }
      "login" => {
        self.start_login();
      }
      "logout" => {
        if let Err(e) = self.session.logout() {
          self.push_toast(Toast::error(format!("Logout failed: {}", e)));
        } else {
          self.unread = None;
          self.show_auth_required();
        }
      }
      "refresh" => {
        self.refresh_remote();
      }
      "quit" => {
        self.should_quit = true;
      }
      _ => {
        // Unknown command
      }
    }
    self.command_input.clear();
  }

  // --------------------------------------------------------------------
  // Loads: spawned, reporting back through the event channel
  // --------------------------------------------------------------------

  fn load_blogs(&self, page: u32) {
    let client = self.client.clone();
    let size = self.config.page_size;
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      match client.blogs(page, size).await {
        Ok(blogs) => {
          let _ = tx.send(Event::Platform(PlatformEvent::BlogsLoaded(blogs)));
        }
        Err(e) => {
          let _ = tx.send(Event::Toast(Toast::error(format!(
            "Could not load blogs: {}",
            e
          ))));
        }
      }
    });
  }

  fn load_blog(&self, slug: String) {
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      match client.blog(&slug).await {
        Ok(blog) => {
          let _ = tx.send(Event::Platform(PlatformEvent::BlogLoaded(Box::new(blog))));
        }
        Err(e) => {
          let _ = tx.send(Event::Toast(Toast::error(format!(
            "Could not load {}: {}",
            slug, e
          ))));
        }
      }

      match client.comments(&slug).await {
        Ok(comments) => {
          let _ = tx.send(Event::Platform(PlatformEvent::CommentsLoaded {
            slug,
            comments,
          }));
        }
        Err(e) => {
          let _ = tx.send(Event::Toast(Toast::error(format!(
            "Could not load comments: {}",
            e
          ))));
        }
      }
    });
  }

  fn load_notifications(&self, page: u32) {
    let client = self.client.clone();
    let size = self.config.page_size;
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      match client.notifications(page, size).await {
        Ok(notifications) => {
          let _ = tx.send(Event::Platform(PlatformEvent::NotificationsLoaded(
            notifications,
          )));
        }
        Err(e) => {
          let _ = tx.send(Event::Toast(Toast::error(format!(
            "Could not load notifications: {}",
            e
          ))));
        }
      }
    });
  }

  fn load_unread_count(&self) {
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      if let Ok(counter) = client.unread_count().await {
        let _ = tx.send(Event::Platform(PlatformEvent::UnreadCountLoaded(
          counter.count,
        )));
      }
      // Failures stay silent: the counter is decoration, not data.
    });
  }

  fn load_homebrew(&self, page: u32) {
    let client = self.client.clone();
    let size = self.config.page_size;
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      match client.homebrew(page, size).await {
        Ok(entries) => {
          let _ = tx.send(Event::Platform(PlatformEvent::HomebrewLoaded(entries)));
        }
        Err(e) => {
          let _ = tx.send(Event::Toast(Toast::error(format!(
            "Could not load homebrew: {}",
            e
          ))));
        }
      }
    });
  }

  /// Invalidate the current view's cache entries and refetch.
  fn refresh_remote(&mut self) {
    enum Refresh {
      Blogs(u32),
      Blog(String),
      Notifications(u32),
      Homebrew(u32),
    }

    let action = match self.view_stack.last_mut() {
      Some(ViewState::BlogList { page, loading, .. }) => {
        *loading = true;
        Refresh::Blogs(*page)
      }
      Some(ViewState::BlogDetail { slug, loading, .. }) => {
        *loading = true;
        Refresh::Blog(slug.clone())
      }
      Some(ViewState::Notifications { page, loading, .. }) => {
        *loading = true;
        Refresh::Notifications(*page)
      }
      Some(ViewState::Homebrew { page, loading, .. }) => {
        *loading = true;
        Refresh::Homebrew(*page)
      }
      _ => return,
    };

    let size = self.config.page_size;
    match action {
      Refresh::Blogs(page) => {
        self.client.invalidate(&ResourceKey::BlogPage { page, size });
        self.load_blogs(page);
      }
      Refresh::Blog(slug) => {
        self.client.invalidate(&ResourceKey::BlogDetail { slug: slug.clone() });
        self.client.invalidate(&ResourceKey::BlogComments { slug: slug.clone() });
        self.load_blog(slug);
      }
      Refresh::Notifications(page) => {
        self.client.invalidate(&ResourceKey::Notifications { page, size });
        self.client.invalidate(&ResourceKey::UnreadCount);
        self.load_notifications(page);
        self.load_unread_count();
      }
      Refresh::Homebrew(page) => {
        self.client.invalidate(&ResourceKey::HomebrewPage { page, size });
        self.load_homebrew(page);
      }
    }
  }

  fn turn_page(&mut self, delta: i32) {
    enum List {
      Blogs,
      Notifications,
      Homebrew,
    }

    let (list, next) = match self.view_stack.last_mut() {
      Some(ViewState::BlogList {
        page,
        blogs,
        selected,
        loading,
      }) => {
        let next = page.saturating_add_signed(delta);
        if next == *page || (delta > 0 && next >= blogs.total_pages) {
          return;
        }
        *page = next;
        *selected = 0;
        *loading = true;
        (List::Blogs, next)
      }
      Some(ViewState::Notifications {
        page,
        notifications,
        selected,
        loading,
      }) => {
        let next = page.saturating_add_signed(delta);
        if next == *page || (delta > 0 && next >= notifications.total_pages) {
          return;
        }
        *page = next;
        *selected = 0;
        *loading = true;
        (List::Notifications, next)
      }
      Some(ViewState::Homebrew {
        page,
        entries,
        selected,
        loading,
      }) => {
        let next = page.saturating_add_signed(delta);
        if next == *page || (delta > 0 && next >= entries.total_pages) {
          return;
        }
        *page = next;
        *selected = 0;
        *loading = true;
        (List::Homebrew, next)
      }
      _ => return,
    };

    match list {
      List::Blogs => self.load_blogs(next),
      List::Notifications => self.load_notifications(next),
      List::Homebrew => self.load_homebrew(next),
    }
  }

  // --------------------------------------------------------------------
  // Mutations: optimistic, spawned; the cache updates immediately and the
  // tick-driven re-read makes the change visible on the next frame
  // --------------------------------------------------------------------

  fn toggle_like(&mut self) {
    let (slug, liked) = match self.view_stack.last() {
      Some(ViewState::BlogDetail {
        slug,
        blog: Some(blog),
        ..
      }) => (slug.clone(), !blog.liked),
      _ => return,
    };

    let client = self.client.clone();
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      if let Err(e) = client.set_liked(&slug, liked).await {
        if let Some(toast) = mutation_toast("Like failed", &e) {
          let _ = tx.send(Event::Toast(toast));
        }
      }
      let _ = tx.send(Event::Platform(PlatformEvent::MutationSettled));
    });
  }

  fn toggle_archive(&mut self) {
    let (slug, archived) = match self.view_stack.last() {
      Some(ViewState::BlogDetail {
        slug,
        blog: Some(blog),
        ..
      }) => (slug.clone(), !blog.archived),
      _ => return,
    };

    let client = self.client.clone();
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      if let Err(e) = client.set_archived(&slug, archived).await {
        if let Some(toast) = mutation_toast("Archive failed", &e) {
          let _ = tx.send(Event::Toast(toast));
        }
      }
      let _ = tx.send(Event::Platform(PlatformEvent::MutationSettled));
    });
  }

  fn start_compose(&mut self) {
    if matches!(self.view_stack.last(), Some(ViewState::BlogDetail { .. })) {
      if !self.session.is_authenticated() {
        self.push_toast(Toast::info("Log in to comment"));
        return;
      }
      self.mode = Mode::Compose;
      self.compose_input.clear();
    }
  }

  fn submit_comment(&mut self) {
    let body = self.compose_input.trim().to_string();
    self.compose_input.clear();
    if body.is_empty() {
      return;
    }

    let slug = match self.view_stack.last() {
      Some(ViewState::BlogDetail { slug, .. }) => slug.clone(),
      _ => return,
    };
    let author = self
      .session
      .profile()
      .map(|p| p.username)
      .unwrap_or_default();

    let client = self.client.clone();
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      if let Err(e) = client.add_comment(&slug, &author, &body).await {
        if let Some(toast) = mutation_toast("Comment failed", &e) {
          let _ = tx.send(Event::Toast(toast));
        }
      }
      let _ = tx.send(Event::Platform(PlatformEvent::MutationSettled));
    });
  }

  fn delete_selected_comment(&mut self) {
    let (slug, comment_id) = match self.view_stack.last() {
      Some(ViewState::BlogDetail {
        slug,
        comments,
        selected_comment,
        ..
      }) => match comments.get(*selected_comment) {
        Some(comment) => (slug.clone(), comment.id),
        None => return,
      },
      _ => return,
    };

    let client = self.client.clone();
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      if let Err(e) = client.delete_comment(&slug, comment_id).await {
        if let Some(toast) = mutation_toast("Delete failed", &e) {
          let _ = tx.send(Event::Toast(toast));
        }
      }
      let _ = tx.send(Event::Platform(PlatformEvent::MutationSettled));
    });
  }

  fn mark_selected_read(&mut self) {
    let (page, id) = match self.view_stack.last() {
      Some(ViewState::Notifications {
        page,
        notifications,
        selected,
        ..
      }) => match notifications.content.get(*selected) {
        Some(notification) if !notification.read => (*page, notification.id),
        _ => return,
      },
      _ => return,
    };

    let client = self.client.clone();
    let size = self.config.page_size;
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      if let Err(e) = client.mark_notification_read(page, size, id).await {
        if let Some(toast) = mutation_toast("Mark read failed", &e) {
          let _ = tx.send(Event::Toast(toast));
        }
      }
      let _ = tx.send(Event::Platform(PlatformEvent::MutationSettled));

      // Counter cache was invalidated by the mutation; refetch it now.
      if let Ok(counter) = client.unread_count().await {
        let _ = tx.send(Event::Platform(PlatformEvent::UnreadCountLoaded(
          counter.count,
        )));
      }
    });
  }

  fn mark_all_read(&mut self) {
    let page = match self.view_stack.last() {
      Some(ViewState::Notifications { page, .. }) => *page,
      _ => return,
    };

    let client = self.client.clone();
    let size = self.config.page_size;
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      if let Err(e) = client.mark_all_read(page, size).await {
        if let Some(toast) = mutation_toast("Mark all read failed", &e) {
          let _ = tx.send(Event::Toast(toast));
        }
      }
      let _ = tx.send(Event::Platform(PlatformEvent::MutationSettled));

      if let Ok(counter) = client.unread_count().await {
        let _ = tx.send(Event::Platform(PlatformEvent::UnreadCountLoaded(
          counter.count,
        )));
      }
    });
  }

  // --------------------------------------------------------------------
  // Event fan-in
  // --------------------------------------------------------------------

  fn handle_platform_event(&mut self, event: PlatformEvent) {
    match event {
      PlatformEvent::BlogsLoaded(page) => {
        if let Some(ViewState::BlogList {
          blogs,
          selected,
          loading,
          ..
        }) = self.view_stack.last_mut()
        {
          *selected = (*selected).min(page.content.len().saturating_sub(1));
          *blogs = page;
          *loading = false;
        }
      }
      PlatformEvent::BlogLoaded(loaded) => {
        if let Some(ViewState::BlogDetail {
          slug,
          blog,
          loading,
          ..
        }) = self.view_stack.last_mut()
        {
          if *slug == loaded.slug {
            *blog = Some(loaded);
            *loading = false;
          }
        }
      }
      PlatformEvent::CommentsLoaded {
        slug: loaded_slug,
        comments: loaded,
      } => {
        if let Some(ViewState::BlogDetail {
          slug,
          comments,
          selected_comment,
          ..
        }) = self.view_stack.last_mut()
        {
          if *slug == loaded_slug {
            *selected_comment = (*selected_comment).min(loaded.len().saturating_sub(1));
            *comments = loaded;
          }
        }
      }
      PlatformEvent::NotificationsLoaded(page) => {
        if let Some(ViewState::Notifications {
          notifications,
          selected,
          loading,
          ..
        }) = self.view_stack.last_mut()
        {
          *selected = (*selected).min(page.content.len().saturating_sub(1));
          *notifications = page;
          *loading = false;
        }
      }
      PlatformEvent::UnreadCountLoaded(count) => {
        self.unread = Some(count);
      }
      PlatformEvent::HomebrewLoaded(page) => {
        if let Some(ViewState::Homebrew {
          entries,
          selected,
          loading,
          ..
        }) = self.view_stack.last_mut()
        {
          *selected = (*selected).min(page.content.len().saturating_sub(1));
          *entries = page;
          *loading = false;
        }
      }
      PlatformEvent::MutationSettled => {
        self.refresh_current_from_cache();
      }
    }
  }

  fn handle_session_event(&mut self, event: SessionEvent) {
    match event {
      SessionEvent::Invalidated => {
        // The remote client already tore the session down; all that is left
        // is redirecting to the auth view.
        self.unread = None;
        self.show_auth_required();
        self.push_toast(Toast::error("Session invalidated, please log in again"));
      }
      SessionEvent::LoggedIn(profile) => {
        self.push_toast(Toast::info(format!("Signed in as {}", profile.username)));
        self.view_stack = vec![ViewState::blog_list(0)];
        self.load_blogs(0);
        self.load_unread_count();
      }
      SessionEvent::ProfileConfirmed(profile) => {
        self.session.confirm_profile(*profile);
      }
      SessionEvent::BootstrapFailed(message) => {
        // The optimistic session could not be confirmed: roll back to
        // logged-out. Auth failures already got here via `Invalidated`.
        tracing::warn!(%message, "could not confirm restored session");
        if self.session.is_authenticated() {
          if let Err(e) = self.session.logout() {
            tracing::error!(error = %e, "failed to clear session storage");
          }
          self.show_auth_required();
          self.push_toast(Toast::error(format!(
            "Could not confirm session: {}",
            message
          )));
        }
      }
    }
  }

  /// Re-read the cache for whatever the user is looking at. Speculative
  /// mutation layers become visible here without any network round-trip,
  /// and the search filter is applied to the displayed copy (the cache
  /// itself stays complete).
  fn refresh_current_from_cache(&mut self) {
    let size = self.config.page_size;
    let needle = self.search_filter.trim().to_lowercase();
    let matches = |fields: &[&str]| {
      needle.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(&needle))
    };

    match self.view_stack.last_mut() {
      Some(ViewState::BlogList {
        page,
        blogs,
        selected,
        loading,
      }) => {
        if let Some(mut cached) = self.client.peek_blogs(*page, size) {
          cached.content.retain(|b| matches(&[&b.title, &b.author]));
          *selected = (*selected).min(cached.content.len().saturating_sub(1));
          *blogs = cached;
          *loading = false;
        }
      }
      Some(ViewState::BlogDetail {
        slug,
        blog,
        comments,
        loading,
        ..
      }) => {
        if let Some(cached) = self.client.peek_blog(slug) {
          *blog = Some(Box::new(cached));
          *loading = false;
        }
        if let Some(cached) = self.client.peek_comments(slug) {
          *comments = cached;
        }
      }
      Some(ViewState::Notifications {
        page,
        notifications,
        selected,
        loading,
      }) => {
        if let Some(mut cached) = self.client.peek_notifications(*page, size) {
          cached.content.retain(|n| matches(&[&n.message]));
          *selected = (*selected).min(cached.content.len().saturating_sub(1));
          *notifications = cached;
          *loading = false;
        }
      }
      Some(ViewState::Homebrew {
        page,
        entries,
        selected,
        loading,
      }) => {
        if let Some(mut cached) = self.client.peek_homebrew(*page, size) {
          cached
            .content
            .retain(|e| matches(&[&e.name, &e.category, &e.author]));
          *selected = (*selected).min(cached.content.len().saturating_sub(1));
          *entries = cached;
          *loading = false;
        }
      }
      _ => {}
    }
  }

  fn move_selection(&mut self, delta: i32) {
    if let Some(view) = self.view_stack.last_mut() {
      match view {
        ViewState::BlogList {
          blogs, selected, ..
        } => {
          let len = blogs.content.len();
          if len > 0 {
            *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
          }
        }
        ViewState::Notifications {
          notifications,
          selected,
          ..
        } => {
          let len = notifications.content.len();
          if len > 0 {
            *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
          }
        }
        ViewState::Homebrew {
          entries, selected, ..
        } => {
          let len = entries.content.len();
          if len > 0 {
            *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
          }
        }
        ViewState::BlogDetail {
          comments,
          selected_comment,
          ..
        } => {
          let len = comments.len();
          if len > 0 {
            *selected_comment = (*selected_comment as i32 + delta).rem_euclid(len as i32) as usize;
          }
        }
        ViewState::AuthRequired { .. } => {}
      }
    }
  }

  fn enter_selected(&mut self) {
    enum Enter {
      OpenBlog(String),
      MarkRead,
      Login,
    }

    let action = match self.view_stack.last() {
      Some(ViewState::BlogList {
        blogs, selected, ..
      }) => match blogs.content.get(*selected) {
        Some(blog) => Enter::OpenBlog(blog.slug.clone()),
        None => return,
      },
      Some(ViewState::Notifications { .. }) => Enter::MarkRead,
      Some(ViewState::AuthRequired { .. }) => Enter::Login,
      _ => return,
    };

    match action {
      Enter::OpenBlog(slug) => {
        self.view_stack.push(ViewState::BlogDetail {
          slug: slug.clone(),
          blog: None,
          comments: Vec::new(),
          selected_comment: 0,
          loading: true,
        });
        self.load_blog(slug);
      }
      Enter::MarkRead => self.mark_selected_read(),
      Enter::Login => self.start_login(),
    }
  }

  fn push_toast(&mut self, toast: Toast) {
    self.toasts.push(ActiveToast {
      toast,
      expires_at: Instant::now() + TOAST_TTL,
    });
  }

  fn expire_toasts(&mut self) {
    let now = Instant::now();
    self.toasts.retain(|t| t.expires_at > now);
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&ViewState> {
    self.view_stack.last()
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn search_filter(&self) -> &str {
    &self.search_filter
  }

  pub fn compose_input(&self) -> &str {
    &self.compose_input
  }

  pub fn title(&self) -> String {
    if let Some(title) = &self.config.title {
      return title.clone();
    }
    self.config.platform.url.clone()
  }

  pub fn username(&self) -> Option<String> {
    self.session.profile().map(|p| p.username)
  }

  pub fn unread(&self) -> Option<u64> {
    self.unread
  }

  pub fn toasts(&self) -> impl Iterator<Item = &Toast> {
    self.toasts.iter().map(|t| &t.toast)
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}

impl ViewState {
  /// Get the label for this view in the breadcrumb
  fn breadcrumb_label(&self) -> String {
    match self {
      ViewState::BlogList { page, .. } => format!("Blogs [{}]", page + 1),
      ViewState::Notifications { .. } => "Notifications".to_string(),
      ViewState::Homebrew { .. } => "Homebrew".to_string(),
      ViewState::AuthRequired { .. } => "Login".to_string(),
      ViewState::BlogDetail { slug, .. } => slug.clone(),
    }
  }
}
