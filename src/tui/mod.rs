pub mod action;
pub mod state;
pub mod view;

use crate::client::RestClient;
use crate::config::Config;
use crate::error::TaskError;
use crate::provider::{DocumentStore, IdentityProvider, MemoryProvider, WatchEvent};
use crate::session::SessionManager;
use crate::store::TaskStore;
use crate::tui::action::{Action, AppEvent};
use crate::tui::state::{AppState, InputMode, Screen};
use crate::tui::view::draw;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::sync::Arc;
use std::{io, time::Duration};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Remote backend when configured, in-memory otherwise.
    match Config::load() {
        Ok(cfg) => {
            let client = Arc::new(
                RestClient::new(
                    &cfg.identity_url,
                    &cfg.store_url,
                    &cfg.api_key,
                    cfg.allow_insecure_certs,
                )
                .map_err(|e| anyhow::anyhow!("{e}"))?,
            );
            run_app(client, None).await
        }
        Err(_) => {
            let provider = Arc::new(MemoryProvider::new());
            run_app(
                provider,
                Some("No config found: using an in-memory provider (nothing is persisted)."),
            )
            .await
        }
    }
}

async fn run_app<P>(provider: Arc<P>, startup_note: Option<&str>) -> Result<()>
where
    P: IdentityProvider + DocumentStore + 'static,
{
    let session = SessionManager::new(Arc::clone(&provider), Arc::clone(&provider));
    let store = TaskStore::new(Arc::clone(&provider), Arc::clone(&provider));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new();
    if let Some(note) = startup_note {
        app_state.message = note.to_string();
    }
    let (action_tx, action_rx) = mpsc::channel(10);
    let (event_tx, mut event_rx) = mpsc::channel(10);

    // SPAWN ACTOR: owns the session manager, the task store, and the live
    // subscription; the UI loop stays synchronous.
    tokio::spawn(actor(session, store, action_rx, event_tx));

    loop {
        terminal.draw(|f| draw(f, &mut app_state))?;

        while let Ok(app_event) = event_rx.try_recv() {
            match app_event {
                AppEvent::SessionStarted(identity) => {
                    app_state.screen = Screen::Tasks;
                    app_state.loading = true;
                    app_state.message = format!("Signed in as {}", identity.email);
                }
                AppEvent::SignedOut => {
                    app_state = AppState::new();
                    app_state.message = "Signed out.".to_string();
                }
                AppEvent::TasksLoaded(tasks) => {
                    app_state.apply_snapshot(tasks);
                }
                AppEvent::TaskReverted(task) => {
                    app_state.revert_task(task);
                }
                AppEvent::Error(msg) => {
                    app_state.message = format!("Error: {}", msg);
                    app_state.loading = false;
                }
                AppEvent::Status(msg) => {
                    app_state.message = msg;
                }
            }
        }

        if crossterm::event::poll(Duration::from_millis(50))? {
            let Event::Key(key) = event::read()? else {
                continue;
            };

            match app_state.screen {
                Screen::Login => match key.code {
                    KeyCode::Esc => {
                        let _ = action_tx.send(Action::Quit).await;
                        break;
                    }
                    KeyCode::Tab => app_state.toggle_login_field(),
                    KeyCode::Enter => {
                        let email = app_state.email_input.clone();
                        let password = app_state.password_input.clone();
                        if !email.is_empty() && !password.is_empty() {
                            let _ = action_tx.send(Action::SignIn(email, password)).await;
                        }
                    }
                    KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        let email = app_state.email_input.clone();
                        let password = app_state.password_input.clone();
                        if !email.is_empty() && !password.is_empty() {
                            let _ = action_tx.send(Action::Register(email, password)).await;
                        }
                    }
                    KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        let email = app_state.email_input.clone();
                        if !email.is_empty() {
                            let _ = action_tx.send(Action::ResetPassword(email)).await;
                        }
                    }
                    KeyCode::Char(c) => app_state.active_login_input().push(c),
                    KeyCode::Backspace => {
                        app_state.active_login_input().pop();
                    }
                    _ => {}
                },

                Screen::Tasks => {
                    if app_state.mode != InputMode::Normal {
                        // --- INPUT MODE ---
                        match key.code {
                            KeyCode::Enter => {
                                let draft = app_state.input_buffer.clone();
                                if !draft.trim().is_empty() {
                                    if app_state.mode == InputMode::Editing {
                                        let target = app_state
                                            .editing_id
                                            .as_ref()
                                            .and_then(|id| {
                                                app_state.tasks.iter().find(|t| &t.id == id)
                                            })
                                            .cloned();
                                        if let Some(task) = target {
                                            let _ = action_tx
                                                .send(Action::EditTask(task, draft))
                                                .await;
                                        }
                                    } else {
                                        let _ = action_tx.send(Action::CreateTask(draft)).await;
                                    }
                                    app_state.reset_input();
                                    app_state.mode = InputMode::Normal;
                                }
                            }
                            KeyCode::Esc => {
                                app_state.reset_input();
                                app_state.mode = InputMode::Normal;
                            }
                            KeyCode::Left => app_state.move_cursor_left(),
                            KeyCode::Right => app_state.move_cursor_right(),
                            KeyCode::Char(c) => app_state.enter_char(c),
                            KeyCode::Backspace => app_state.delete_char(),
                            _ => {}
                        }
                    } else {
                        // --- NORMAL MODE ---
                        match key.code {
                            KeyCode::Char('q') => {
                                let _ = action_tx.send(Action::Quit).await;
                                break;
                            }
                            KeyCode::Char('s') => {
                                let _ = action_tx.send(Action::SignOut).await;
                            }
                            KeyCode::Char('a') => {
                                app_state.mode = InputMode::Creating;
                            }
                            KeyCode::Char('e') => {
                                if let Some(task) = app_state.selected_task().cloned() {
                                    app_state.editing_id = Some(task.id);
                                    app_state.input_buffer = task.content;
                                    app_state.cursor_position =
                                        app_state.input_buffer.chars().count();
                                    app_state.mode = InputMode::Editing;
                                }
                            }
                            KeyCode::Down | KeyCode::Char('j') => app_state.next(),
                            KeyCode::Up | KeyCode::Char('k') => app_state.previous(),
                            KeyCode::Char(' ') => {
                                if let Some(idx) = app_state.list_state.selected()
                                    && idx < app_state.tasks.len()
                                {
                                    // Optimistic: flip on screen first; a failed
                                    // write comes back as TaskReverted.
                                    let original = app_state.tasks[idx].clone();
                                    app_state.tasks[idx].completed =
                                        !app_state.tasks[idx].completed;
                                    let _ = action_tx.send(Action::ToggleTask(original)).await;
                                }
                            }
                            KeyCode::Char('d') => {
                                if let Some(task) = app_state.selected_task().cloned() {
                                    let _ = action_tx.send(Action::DeleteTask(task)).await;
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

async fn actor<I, D>(
    session: SessionManager<I, D>,
    store: TaskStore<I, D>,
    mut action_rx: mpsc::Receiver<Action>,
    event_tx: mpsc::Sender<AppEvent>,
) where
    I: IdentityProvider + 'static,
    D: DocumentStore + 'static,
{
    let mut watch_forwarder: Option<JoinHandle<()>> = None;

    while let Some(user_action) = action_rx.recv().await {
        match user_action {
            Action::Quit => break,

            Action::SignIn(email, password) => {
                let _ = event_tx
                    .send(AppEvent::Status("Signing in...".to_string()))
                    .await;
                match session.authenticate(&email, &password).await {
                    Ok(identity) => {
                        let _ = event_tx.send(AppEvent::SessionStarted(identity)).await;
                        open_subscription(&store, &event_tx, &mut watch_forwarder).await;
                    }
                    Err(e) => {
                        let _ = event_tx.send(AppEvent::Error(e.message)).await;
                    }
                }
            }

            Action::Register(email, password) => {
                let _ = event_tx
                    .send(AppEvent::Status("Creating account...".to_string()))
                    .await;
                match session.register(&email, &password).await {
                    Ok(identity) => {
                        let _ = event_tx.send(AppEvent::SessionStarted(identity)).await;
                        open_subscription(&store, &event_tx, &mut watch_forwarder).await;
                    }
                    Err(e) => {
                        let _ = event_tx.send(AppEvent::Error(e.message)).await;
                    }
                }
            }

            Action::ResetPassword(email) => match session.request_password_reset(&email).await {
                Ok(()) => {
                    let _ = event_tx
                        .send(AppEvent::Status(format!("Reset email sent to {email}")))
                        .await;
                }
                Err(e) => {
                    let _ = event_tx.send(AppEvent::Error(e.message)).await;
                }
            },

            Action::SignOut => {
                // Tear the subscription down with the view that used it.
                if let Some(forwarder) = watch_forwarder.take() {
                    forwarder.abort();
                }
                match session.sign_out().await {
                    Ok(()) => {
                        let _ = event_tx.send(AppEvent::SignedOut).await;
                    }
                    Err(e) => {
                        let _ = event_tx.send(AppEvent::Error(e.message)).await;
                    }
                }
            }

            Action::CreateTask(draft) => {
                if let Err(e) = store.create(&draft).await {
                    let _ = event_tx.send(AppEvent::Error(task_error_text(&e))).await;
                }
            }

            Action::ToggleTask(mut task) => {
                if let Err(e) = store.toggle_completion(&mut task).await {
                    // `task` is rolled back; hand it back to the screen.
                    let _ = event_tx.send(AppEvent::TaskReverted(task)).await;
                    let _ = event_tx.send(AppEvent::Error(task_error_text(&e))).await;
                }
            }

            Action::EditTask(mut task, content) => {
                task.content = content;
                if let Err(e) = store.update(&task).await {
                    let _ = event_tx.send(AppEvent::Error(task_error_text(&e))).await;
                }
            }

            Action::DeleteTask(task) => {
                if let Err(e) = store.delete(&task).await {
                    let _ = event_tx.send(AppEvent::Error(task_error_text(&e))).await;
                }
            }
        }
    }
}

/// Opens the live query and forwards its events to the UI channel. Aborting
/// the forwarder drops the watch handle, which releases the backend listener.
async fn open_subscription<I, D>(
    store: &TaskStore<I, D>,
    event_tx: &mpsc::Sender<AppEvent>,
    slot: &mut Option<JoinHandle<()>>,
) where
    I: IdentityProvider + 'static,
    D: DocumentStore + 'static,
{
    if let Some(previous) = slot.take() {
        previous.abort();
    }
    match store.subscribe().await {
        Ok(mut watch) => {
            let tx = event_tx.clone();
            *slot = Some(tokio::spawn(async move {
                while let Some(watch_event) = watch.next_event().await {
                    match watch_event {
                        WatchEvent::Snapshot(tasks) => {
                            if tx.send(AppEvent::TasksLoaded(tasks)).await.is_err() {
                                break;
                            }
                        }
                        WatchEvent::Terminated(failure) => {
                            let _ = tx
                                .send(AppEvent::Error(format!(
                                    "Live updates stopped: {}",
                                    failure.code
                                )))
                                .await;
                            break;
                        }
                    }
                }
            }));
        }
        Err(e) => {
            let _ = event_tx.send(AppEvent::Error(task_error_text(&e))).await;
        }
    }
}

fn task_error_text(e: &TaskError) -> String {
    match e {
        TaskError::Auth(auth) => auth.message.clone(),
        TaskError::Invalid(v) => v.to_string(),
    }
}
