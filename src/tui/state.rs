use crate::model::Task;
use ratatui::widgets::ListState;

#[derive(PartialEq, Clone, Copy)]
pub enum Screen {
    Login,
    Tasks,
}

#[derive(PartialEq, Clone, Copy)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(PartialEq, Clone, Copy)]
pub enum InputMode {
    Normal,
    Creating,
    Editing,
}

pub struct AppState {
    pub screen: Screen,
    pub login_field: LoginField,
    pub email_input: String,
    pub password_input: String,
    pub tasks: Vec<Task>,
    pub list_state: ListState,
    pub message: String,
    pub loading: bool,
    pub mode: InputMode,
    pub input_buffer: String,
    pub cursor_position: usize,
    pub editing_id: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        let mut l_state = ListState::default();
        l_state.select(Some(0));
        Self {
            screen: Screen::Login,
            login_field: LoginField::Email,
            email_input: String::new(),
            password_input: String::new(),
            tasks: vec![],
            list_state: l_state,
            message: "Enter: Sign in | Ctrl+r: Register | Tab: Field".to_string(),
            loading: false,
            mode: InputMode::Normal,
            input_buffer: String::new(),
            cursor_position: 0,
            editing_id: None,
        }
    }

    pub fn toggle_login_field(&mut self) {
        self.login_field = match self.login_field {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }

    pub fn active_login_input(&mut self) -> &mut String {
        match self.login_field {
            LoginField::Email => &mut self.email_input,
            LoginField::Password => &mut self.password_input,
        }
    }

    pub fn move_cursor_left(&mut self) {
        let cursor_moved_left = self.cursor_position.saturating_sub(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_left);
    }
    pub fn move_cursor_right(&mut self) {
        let cursor_moved_right = self.cursor_position.saturating_add(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_right);
    }
    pub fn enter_char(&mut self, new_char: char) {
        self.input_buffer.insert(self.cursor_position, new_char);
        self.move_cursor_right();
    }
    pub fn delete_char(&mut self) {
        if self.cursor_position != 0 {
            let current_index = self.cursor_position;
            let before = self.input_buffer.chars().take(current_index - 1);
            let after = self.input_buffer.chars().skip(current_index);
            self.input_buffer = before.chain(after).collect();
            self.move_cursor_left();
        }
    }
    pub fn reset_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
        self.editing_id = None;
    }
    fn clamp_cursor(&self, new_cursor_pos: usize) -> usize {
        new_cursor_pos.clamp(0, self.input_buffer.chars().count())
    }

    /// Replaces the visible list with a fresh snapshot, keeping the
    /// selection in range.
    pub fn apply_snapshot(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.loading = false;
        let sel = self.list_state.selected().unwrap_or(0);
        if self.tasks.is_empty() {
            self.list_state.select(Some(0));
        } else if sel >= self.tasks.len() {
            self.list_state.select(Some(self.tasks.len() - 1));
        }
    }

    /// Puts a rolled-back record back in place after a failed toggle.
    pub fn revert_task(&mut self, reverted: Task) {
        if let Some(idx) = self.tasks.iter().position(|t| t.id == reverted.id) {
            self.tasks[idx] = reverted;
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let idx = self.list_state.selected()?;
        self.tasks.get(idx)
    }

    pub fn next(&mut self) {
        let len = self.tasks.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.tasks.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_clamps_selection() {
        let mut state = AppState::new();
        state.apply_snapshot(vec![
            Task::new("u", "one"),
            Task::new("u", "two"),
            Task::new("u", "three"),
        ]);
        state.list_state.select(Some(2));

        state.apply_snapshot(vec![Task::new("u", "only")]);
        assert_eq!(state.list_state.selected(), Some(0));
    }

    #[test]
    fn revert_replaces_matching_id_only() {
        let mut state = AppState::new();
        let mut a = Task::new("u", "a");
        let b = Task::new("u", "b");
        state.apply_snapshot(vec![a.clone(), b.clone()]);

        // Optimistic flip on screen, then the rolled-back record comes home.
        state.tasks[0].completed = true;
        a.completed = false;
        state.revert_task(a.clone());

        assert!(!state.tasks[0].completed);
        assert_eq!(state.tasks[1], b);
    }
}
