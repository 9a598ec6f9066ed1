use crate::model::{Identity, Task};

#[derive(Debug)]
pub enum Action {
    SignIn(String, String),
    Register(String, String),
    ResetPassword(String),
    SignOut,
    CreateTask(String),
    /// Carries the pre-flip record; the store flips and persists it.
    ToggleTask(Task),
    EditTask(Task, String),
    DeleteTask(Task),
    Quit,
}

#[derive(Debug)]
pub enum AppEvent {
    SessionStarted(Identity),
    SignedOut,
    TasksLoaded(Vec<Task>),
    /// A toggle failed; this is the rolled-back record to restore on screen.
    TaskReverted(Task),
    Error(String),
    Status(String),
}
