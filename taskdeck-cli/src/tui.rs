//! Interactive terminal UI.
//!
//! The render loop owns the `AppState`. Key presses become `Command`s; any
//! effects they produce go to the worker and their outcomes are drained at
//! the top of every frame.

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, LineGauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};

use taskdeck_core::{
    format_due_date, parse_due_date, AppState, Command, Credentials, EditField, Feedback, FeedbackKind, FieldValue,
    Task, TaskDraft, TaskId, Variant,
};

use crate::worker::WorkerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Create,
    RowEdit,
    FieldEdit,
    SignIn,
}

/// Focused input of the create / row-edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormFocus {
    Text,
    Category,
    Priority,
    Due,
}

impl FormFocus {
    fn next(self) -> Self {
        match self {
            FormFocus::Text => FormFocus::Category,
            FormFocus::Category => FormFocus::Priority,
            FormFocus::Priority => FormFocus::Due,
            FormFocus::Due => FormFocus::Text,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormFocus::Text => FormFocus::Due,
            FormFocus::Category => FormFocus::Text,
            FormFocus::Priority => FormFocus::Category,
            FormFocus::Due => FormFocus::Priority,
        }
    }
}

#[derive(Debug, Default)]
struct SignInForm {
    email: String,
    password: String,
    on_password: bool,
}

impl SignInForm {
    fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }

    fn input(&mut self) -> &mut String {
        if self.on_password { &mut self.password } else { &mut self.email }
    }
}

struct Ui {
    state: AppState,
    worker: Option<WorkerHandle>,
    mode: Mode,
    selected: usize,
    focus: FormFocus,
    /// Raw text of the due date being typed, parsed on submit.
    due_input: String,
    sign_in: SignInForm,
    show_help: bool,
    quit: bool,
}

impl Ui {
    fn new(state: AppState, worker: Option<WorkerHandle>) -> Self {
        let mut ui = Self {
            state,
            worker,
            mode: Mode::Browse,
            selected: 0,
            focus: FormFocus::Text,
            due_input: String::new(),
            sign_in: SignInForm::default(),
            show_help: false,
            quit: false,
        };
        ui.send(Command::Start);
        ui
    }

    fn send(&mut self, cmd: Command) {
        let effects = self.state.dispatch(cmd);
        self.submit(effects);
        self.sync_mode();
    }

    fn submit(&mut self, effects: Vec<taskdeck_core::Effect>) {
        if effects.is_empty() {
            return;
        }
        match &self.worker {
            Some(w) => w.submit(effects),
            None => tracing::warn!(count = effects.len(), "no worker; dropping effects"),
        }
    }

    /// Apply every outcome the worker has finished so far.
    fn drain(&mut self) {
        loop {
            let Some(outcome) = self.worker.as_ref().and_then(WorkerHandle::try_recv) else {
                break;
            };
            let effects = self.state.resolve(outcome);
            self.submit(effects);
        }
        self.sync_mode();
    }

    /// Keep the mode in line with the state after a command or outcome.
    /// The sign-in form waits until the stored session has been checked.
    fn sync_mode(&mut self) {
        let signed_out = self.state.variant == Variant::Persisted
            && !self.state.auth.is_authenticated()
            && !self.state.loading;
        if signed_out {
            if self.mode != Mode::SignIn {
                self.mode = Mode::SignIn;
                self.sign_in.password.clear();
            }
        } else {
            match self.mode {
                Mode::SignIn => {
                    self.mode = Mode::Browse;
                    self.sign_in.password.clear();
                }
                Mode::RowEdit if self.state.board.edits().row().is_none() => self.mode = Mode::Browse,
                Mode::FieldEdit if self.state.board.edits().field().is_none() => self.mode = Mode::Browse,
                _ => {}
            }
        }
        let len = self.state.visible_tasks().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.state.visible_tasks().get(self.selected).map(|t| t.id.clone())
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.state.feedback = Some(Feedback::error(message));
    }

    fn draft_mut(&mut self) -> Option<&mut TaskDraft> {
        match self.mode {
            Mode::Create => Some(&mut self.state.form),
            Mode::RowEdit => self.state.board.edits_mut().row_mut().map(|r| &mut r.draft),
            _ => None,
        }
    }

    fn draft(&self) -> Option<&TaskDraft> {
        match self.mode {
            Mode::Create | Mode::Browse => Some(&self.state.form),
            Mode::RowEdit => self.state.board.edits().row().map(|r| &r.draft),
            _ => None,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        match self.mode {
            Mode::Browse => self.on_browse_key(key.code),
            Mode::Create | Mode::RowEdit => self.on_form_key(key.code),
            Mode::FieldEdit => self.on_field_key(key.code),
            Mode::SignIn => self.on_sign_in_key(key.code),
        }
    }

    fn on_browse_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.state.visible_tasks().len();
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Char('n') | KeyCode::Char('a') => {
                self.mode = Mode::Create;
                self.focus = FormFocus::Text;
                self.due_input = format_due_date(self.state.form.due_date);
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    self.send(Command::Toggle(id));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    self.send(Command::Delete(id));
                }
            }
            KeyCode::Char('e') => {
                if let Some(id) = self.selected_id() {
                    self.send(Command::BeginRowEdit(id));
                    if let Some(row) = self.state.board.edits().row() {
                        self.due_input = format_due_date(row.draft.due_date);
                        self.focus = FormFocus::Text;
                        self.mode = Mode::RowEdit;
                    }
                }
            }
            KeyCode::Char('c') => self.begin_field(EditField::Category),
            KeyCode::Char('p') => self.begin_field(EditField::Priority),
            KeyCode::Char('u') => self.begin_field(EditField::DueDate),
            KeyCode::Char('s') => self.state.view.status = self.state.view.status.next(),
            KeyCode::Char('f') => self.state.view.category = self.state.view.category.next(),
            KeyCode::Char('g') => self.state.view.sort = self.state.view.sort.next(),
            KeyCode::Char('r') => self.send(Command::Refresh),
            KeyCode::Char('x') => self.send(Command::DismissFeedback),
            KeyCode::Char('o') => self.send(Command::SignOut),
            _ => {}
        }
        self.sync_mode();
    }

    fn begin_field(&mut self, field: EditField) {
        let Some(id) = self.selected_id() else {
            return;
        };
        self.send(Command::BeginFieldEdit(id, field));
        if let Some(f) = self.state.board.edits().field() {
            if let FieldValue::DueDate(d) = f.value {
                self.due_input = format_due_date(d);
            }
            self.mode = Mode::FieldEdit;
        }
    }

    fn on_form_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                if self.mode == Mode::RowEdit {
                    self.send(Command::CancelRowEdit);
                }
                self.mode = Mode::Browse;
            }
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Enter => self.submit_form(),
            code => {
                let focus = self.focus;
                let due_input = &mut self.due_input;
                let Some(draft) = (match self.mode {
                    Mode::Create => Some(&mut self.state.form),
                    Mode::RowEdit => self.state.board.edits_mut().row_mut().map(|r| &mut r.draft),
                    _ => None,
                }) else {
                    return;
                };
                match (focus, code) {
                    (FormFocus::Text, KeyCode::Char(c)) => draft.text.push(c),
                    (FormFocus::Text, KeyCode::Backspace) => {
                        draft.text.pop();
                    }
                    (FormFocus::Category, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) => {
                        draft.category = draft.category.next()
                    }
                    (FormFocus::Priority, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) => {
                        draft.priority = draft.priority.next()
                    }
                    (FormFocus::Due, KeyCode::Char(c)) if c.is_ascii_digit() || c == '-' => due_input.push(c),
                    (FormFocus::Due, KeyCode::Backspace) => {
                        due_input.pop();
                    }
                    _ => {}
                }
            }
        }
    }

    fn submit_form(&mut self) {
        let due = match parse_due_date(&self.due_input) {
            Ok(d) => d,
            Err(e) => {
                self.fail(e.to_string());
                return;
            }
        };
        if let Some(draft) = self.draft_mut() {
            draft.due_date = due;
        }
        match self.mode {
            Mode::Create => {
                if self.state.form.trimmed_text().is_none() {
                    return;
                }
                self.send(Command::Create);
                self.mode = Mode::Browse;
            }
            Mode::RowEdit => self.send(Command::SaveRowEdit),
            _ => {}
        }
    }

    fn on_field_key(&mut self, code: KeyCode) {
        let Some(value) = self.state.board.edits().field().map(|f| f.value) else {
            self.mode = Mode::Browse;
            return;
        };
        match (value, code) {
            (_, KeyCode::Esc) => self.send(Command::CancelFieldEdit),
            (FieldValue::DueDate(_), KeyCode::Enter) => match parse_due_date(&self.due_input) {
                Ok(d) => {
                    self.send(Command::SetFieldDraft(FieldValue::DueDate(d)));
                    self.send(Command::SaveFieldEdit);
                }
                Err(e) => self.fail(e.to_string()),
            },
            (_, KeyCode::Enter) => self.send(Command::SaveFieldEdit),
            (FieldValue::DueDate(_), KeyCode::Char(c)) if c.is_ascii_digit() || c == '-' => self.due_input.push(c),
            (FieldValue::DueDate(_), KeyCode::Backspace) => {
                self.due_input.pop();
            }
            (FieldValue::Category(c), KeyCode::Char(' ') | KeyCode::Tab | KeyCode::Left | KeyCode::Right) => {
                self.send(Command::SetFieldDraft(FieldValue::Category(c.next())))
            }
            (FieldValue::Priority(p), KeyCode::Char(' ') | KeyCode::Tab | KeyCode::Left | KeyCode::Right) => {
                self.send(Command::SetFieldDraft(FieldValue::Priority(p.next())))
            }
            _ => {}
        }
    }

    fn on_sign_in_key(&mut self, code: KeyCode) {
        if self.state.auth_pending {
            if code == KeyCode::Esc {
                self.quit = true;
            }
            return;
        }
        match code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Tab | KeyCode::BackTab => self.sign_in.on_password = !self.sign_in.on_password,
            KeyCode::Enter => {
                let creds = self.sign_in.credentials();
                self.send(Command::SignIn(creds));
            }
            KeyCode::F(2) => {
                let creds = self.sign_in.credentials();
                self.send(Command::SignUp(creds));
            }
            KeyCode::Backspace => {
                self.sign_in.input().pop();
            }
            KeyCode::Char(c) => self.sign_in.input().push(c),
            _ => {}
        }
    }
}

pub fn run_tui(state: AppState, worker: Option<WorkerHandle>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = ui_loop(&mut terminal, Ui::new(state, worker));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

fn ui_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, mut ui: Ui) -> Result<()> {
    while !ui.quit {
        ui.drain();
        terminal.draw(|f| draw(f, &ui))?;

        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                ui.on_key(key);
            }
        }
    }
    Ok(())
}

fn draw(f: &mut Frame, ui: &Ui) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(if ui.show_help { 6 } else { 3 }),
        ])
        .split(f.area());

    draw_header(f, ui, chunks[0]);
    if ui.mode == Mode::SignIn {
        draw_sign_in(f, ui, chunks[1]);
    } else {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(34)])
            .split(chunks[1]);
        draw_tasks(f, ui, body[0]);
        draw_summary(f, ui, body[1]);
        draw_form(f, ui, chunks[2]);
    }
    draw_footer(f, ui, chunks[3]);
}

fn draw_header(f: &mut Frame, ui: &Ui, area: Rect) {
    let who = match (ui.state.variant, ui.state.auth.session()) {
        (Variant::Local, _) => "local board".to_string(),
        (Variant::Persisted, Some(s)) => s.email.clone().unwrap_or_else(|| s.user_id.clone()),
        (Variant::Persisted, None) => "signed out".to_string(),
    };
    let view = &ui.state.view;
    let mut spans = vec![
        Span::styled("taskdeck ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::styled(format!("({who})  "), Style::default().fg(Color::Gray)),
        Span::raw(format!("status: {} [s]  ", view.status.label())),
        Span::raw(format!("category: {} [f]  ", view.category)),
        Span::raw(format!("sort: {} [g]", view.sort.label())),
    ];
    if ui.state.loading || ui.state.creating || ui.state.auth_pending {
        spans.push(Span::styled("  working...", Style::default().fg(Color::Cyan)));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn task_line(ui: &Ui, t: &Task) -> Line<'static> {
    let edits = ui.state.board.edits();
    let marker = if edits.is_row_editing(&t.id) {
        "*"
    } else if edits.field().is_some_and(|e| e.task_id == t.id) {
        "~"
    } else {
        " "
    };
    let field = edits.field().filter(|e| e.task_id == t.id).map(|e| e.value);
    let category = match field {
        Some(FieldValue::Category(c)) => format!("<{}>", c.label()),
        _ => t.category.label().to_string(),
    };
    let priority = match field {
        Some(FieldValue::Priority(p)) => format!("<{}>", p.label()),
        _ => t.priority.label().to_string(),
    };
    let due = match field {
        Some(FieldValue::DueDate(_)) => format!("<{}_>", ui.due_input),
        _ => format_due_date(t.due_date),
    };
    let text_style = if t.completed {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    let priority_color = match t.priority {
        taskdeck_core::Priority::High => Color::Red,
        taskdeck_core::Priority::Medium => Color::Yellow,
        taskdeck_core::Priority::Low => Color::Green,
    };
    Line::from(vec![
        Span::raw(format!("{marker}[{}] ", if t.completed { "x" } else { " " })),
        Span::styled(format!("{:<30} ", t.text), text_style),
        Span::styled(format!("{category:<10} "), Style::default().fg(Color::Cyan)),
        Span::styled(format!("{priority:<8} "), Style::default().fg(priority_color)),
        Span::raw(due),
    ])
}

fn draw_tasks(f: &mut Frame, ui: &Ui, area: Rect) {
    let visible = ui.state.visible_tasks();
    let title = format!("tasks ({} shown / {} total)", visible.len(), ui.state.board.len());
    let block = Block::default().borders(Borders::ALL).title(title);

    if visible.is_empty() {
        let message = if ui.state.loading { "Loading..." } else { "No tasks here. Press n to add one." };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(Color::Gray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = visible.iter().map(|t| ListItem::new(task_line(ui, t))).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(Some(ui.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_summary(f: &mut Frame, ui: &Ui, area: Rect) {
    let stats = ui.state.stats();
    let per_category = ui.state.category_stats();

    let mut constraints = vec![Constraint::Length(3), Constraint::Length(5)];
    constraints.extend(per_category.iter().map(|_| Constraint::Length(1)));
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(stats.percent.min(100) as u16);
    f.render_widget(gauge, rows[0]);

    let counts = Paragraph::new(Text::from(vec![
        Line::raw(format!("total      {}", stats.total)),
        Line::raw(format!("completed  {}", stats.completed)),
        Line::raw(format!("pending    {}", stats.pending)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("summary"));
    f.render_widget(counts, rows[1]);

    for (i, (category, s)) in per_category.iter().enumerate() {
        let ratio = if s.total == 0 { 0.0 } else { s.completed as f64 / s.total as f64 };
        let line = LineGauge::default()
            .filled_style(Style::default().fg(Color::Cyan))
            .ratio(ratio)
            .label(format!("{:<8} {}/{}", category.label(), s.completed, s.total));
        f.render_widget(line, rows[2 + i]);
    }
}

fn draw_form(f: &mut Frame, ui: &Ui, area: Rect) {
    let (title, active) = match ui.mode {
        Mode::Create => ("new task (Enter add, Tab next field, Esc back)", true),
        Mode::RowEdit => ("edit task (Enter save, Tab next field, Esc cancel)", true),
        Mode::FieldEdit => ("edit field (Space change, Enter save, Esc cancel)", false),
        _ => ("new task [n]", false),
    };

    let line = match (ui.mode, ui.draft()) {
        (Mode::FieldEdit, _) | (_, None) => Line::raw("Editing in the list above."),
        (mode, Some(d)) => {
            let style_for = |focus: FormFocus| {
                if active && ui.focus == focus {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default()
                }
            };
            let due = if mode == Mode::Browse { format_due_date(d.due_date) } else { ui.due_input.clone() };
            Line::from(vec![
                Span::raw("text: "),
                Span::styled(format!("{:<24}", d.text), style_for(FormFocus::Text)),
                Span::raw("  category: "),
                Span::styled(d.category.label(), style_for(FormFocus::Category)),
                Span::raw("  priority: "),
                Span::styled(d.priority.label(), style_for(FormFocus::Priority)),
                Span::raw("  due: "),
                Span::styled(format!("{:<10}", due), style_for(FormFocus::Due)),
            ])
        }
    };
    let form = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(form, area);
}

fn draw_sign_in(f: &mut Frame, ui: &Ui, area: Rect) {
    let field = |label: &str, value: String, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        Line::from(vec![Span::raw(format!("{label:<10}")), Span::styled(format!("{value:<32}"), style)])
    };
    let form = &ui.sign_in;
    let lines = vec![
        Line::from(Span::styled(
            "Sign in to see your tasks",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        field("email", form.email.clone(), !form.on_password),
        field("password", "*".repeat(form.password.chars().count()), form.on_password),
        Line::raw(""),
        Line::from(Span::styled(
            "Enter sign in   F2 create account   Tab switch field   Esc quit",
            Style::default().fg(Color::Gray),
        )),
    ];
    let panel = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("account"));
    f.render_widget(panel, area);
}

fn draw_footer(f: &mut Frame, ui: &Ui, area: Rect) {
    let mut lines = Vec::new();
    match &ui.state.feedback {
        Some(fb) => {
            let color = match fb.kind {
                FeedbackKind::Success => Color::Green,
                FeedbackKind::Error => Color::Red,
                FeedbackKind::Info => Color::Cyan,
            };
            lines.push(Line::from(vec![
                Span::styled(fb.message.clone(), Style::default().fg(color)),
                Span::styled("  (x to dismiss)", Style::default().fg(Color::Gray)),
            ]));
        }
        None => lines.push(Line::styled("? for keys, q to quit", Style::default().fg(Color::Gray))),
    }
    if ui.show_help {
        lines.push(Line::raw("j/k move  space toggle  d delete  e edit row  c/p/u edit category/priority/due"));
        lines.push(Line::raw("n new task  s/f/g status/category/sort  r refresh  x dismiss  o sign out"));
    }
    let footer = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
