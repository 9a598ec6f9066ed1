use crate::tui::state::{AppState, InputMode, LoginField, Screen};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

pub fn draw(f: &mut Frame, state: &mut AppState) {
    match state.screen {
        Screen::Login => draw_login(f, state),
        Screen::Tasks => draw_tasks(f, state),
    }
}

fn draw_login(f: &mut Frame, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    let title = Paragraph::new("cocher")
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let field_style = |field: LoginField| {
        if state.login_field == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let email = Paragraph::new(state.email_input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Email ")
            .border_style(field_style(LoginField::Email)),
    );
    f.render_widget(email, chunks[1]);

    let masked = "*".repeat(state.password_input.chars().count());
    let password = Paragraph::new(masked).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Password ")
            .border_style(field_style(LoginField::Password)),
    );
    f.render_widget(password, chunks[2]);

    let active_len = match state.login_field {
        LoginField::Email => state.email_input.chars().count(),
        LoginField::Password => state.password_input.chars().count(),
    };
    let active_area = match state.login_field {
        LoginField::Email => chunks[1],
        LoginField::Password => chunks[2],
    };
    f.set_cursor_position((active_area.x + 1 + active_len as u16, active_area.y + 1));

    let status = Paragraph::new(state.message.clone())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    f.render_widget(status, chunks[4]);
}

fn draw_tasks(f: &mut Frame, state: &mut AppState) {
    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    let task_items: Vec<ListItem> = state
        .tasks
        .iter()
        .map(|t| {
            let checkbox = if t.completed { "[x]" } else { "[ ]" };
            let style = if t.completed {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::styled(format!("{} {}", checkbox, t.content), style))
        })
        .collect();

    let title = if state.loading {
        " Tasks (Loading...) ".to_string()
    } else {
        format!(" Tasks ({}) ", state.tasks.len())
    };
    let task_list = List::new(task_items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        );
    f.render_stateful_widget(task_list, v_chunks[0], &mut state.list_state);

    // --- Footer / Input ---
    let footer_area = v_chunks[1];
    match state.mode {
        InputMode::Creating | InputMode::Editing => {
            let (title, color) = match state.mode {
                InputMode::Editing => (" Edit Task ", Color::Magenta),
                _ => (" New Task ", Color::Yellow),
            };
            let input = Paragraph::new(format!("> {}", state.input_buffer))
                .style(Style::default().fg(color))
                .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(input, footer_area);
            let cursor_x = footer_area.x + 3 + state.cursor_position as u16;
            f.set_cursor_position((cursor_x, footer_area.y + 1));
        }
        InputMode::Normal => {
            let f_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(footer_area);
            let status = Paragraph::new(state.message.clone())
                .style(Style::default().fg(Color::Cyan))
                .block(
                    Block::default()
                        .borders(Borders::LEFT | Borders::TOP | Borders::BOTTOM)
                        .title(" Status "),
                );
            let help_text = "Space:Toggle | a:Add | e:Edit | d:Del | s:SignOut | q:Quit";
            let help = Paragraph::new(help_text)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Right)
                .block(
                    Block::default()
                        .borders(Borders::RIGHT | Borders::TOP | Borders::BOTTOM)
                        .title(" Actions "),
                );
            f.render_widget(status, f_chunks[0]);
            f.render_widget(help, f_chunks[1]);
        }
    }
}
