//! One-shot subcommands. Each builds a persisted `AppState`, restores the
//! session and drives a single command through the `Controller`.

use anyhow::{bail, Context, Result};
use std::io::{self, Write};

use taskdeck_core::{
    format_due_date, parse_due_date, AppState, Category, CategoryFilter, Command, Controller, Credentials,
    FieldValue, Priority, SortKey, StatusFilter, Task, TaskDraft, TaskId,
};

use crate::backend::Backend;
use crate::config::Config;
use crate::rest_auth::RestAuth;
use crate::rest_store::RestStore;

pub type RestController = Controller<RestStore, RestAuth>;

/// Short id shown in listings; any unique prefix is accepted back.
const SHORT_ID: usize = 8;

pub async fn open(cfg: &Config) -> Result<RestController> {
    let backend = Backend::new(cfg.require_backend()?);
    let state = AppState::persisted().with_view(cfg.view_options()?);
    let mut c = Controller::new(state, RestStore::new(backend.clone()), RestAuth::new(backend));
    c.send(Command::Start).await;
    Ok(c)
}

async fn open_signed_in(cfg: &Config) -> Result<RestController> {
    let c = open(cfg).await?;
    if !c.state().auth.is_authenticated() {
        bail!("not signed in. Run: taskdeck signin --email you@example.com");
    }
    check_feedback(&c)?;
    Ok(c)
}

/// Turn an error feedback left by the last command into a failure.
fn check_feedback(c: &RestController) -> Result<()> {
    match &c.state().feedback {
        Some(fb) if fb.is_error() => bail!("{}", fb.message),
        _ => Ok(()),
    }
}

fn resolve(c: &RestController, needle: &str) -> Result<TaskId> {
    match c.state().board.resolve_id(needle) {
        Some(id) => Ok(id),
        None => bail!("no single task matches id '{needle}' (see: taskdeck list)"),
    }
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s).context("read password")?;
    Ok(s.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn signin(cfg: &Config, email: String) -> Result<()> {
    let mut c = open(cfg).await?;
    if let Some(s) = c.state().auth.session() {
        println!("Already signed in as {}", s.email.as_deref().unwrap_or(&s.user_id));
        return Ok(());
    }
    let password = prompt_secret("Password")?;
    c.send(Command::SignIn(Credentials::new(email, password))).await;
    check_feedback(&c)?;
    match c.state().auth.session() {
        Some(s) => println!("Signed in as {}", s.email.as_deref().unwrap_or(&s.user_id)),
        None => bail!("sign in did not complete"),
    }
    Ok(())
}

pub async fn signup(cfg: &Config, email: String) -> Result<()> {
    let mut c = open(cfg).await?;
    if c.state().auth.is_authenticated() {
        bail!("already signed in; run taskdeck signout first");
    }
    let password = prompt_secret("Choose a password")?;
    c.send(Command::SignUp(Credentials::new(email, password))).await;
    check_feedback(&c)?;
    if let Some(fb) = &c.state().feedback {
        println!("{}", fb.message);
    }
    Ok(())
}

pub async fn signout(cfg: &Config) -> Result<()> {
    let mut c = open(cfg).await?;
    if !c.state().auth.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    c.send(Command::SignOut).await;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(cfg: &Config) -> Result<()> {
    let c = open(cfg).await?;
    match c.state().auth.session() {
        Some(s) => {
            println!("{}", s.email.as_deref().unwrap_or("(no email)"));
            println!("user id: {}", s.user_id);
            if let Some(at) = s.expires_at {
                println!("session expires: {}", at.to_rfc3339());
            }
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct ListArgs {
    pub status: Option<StatusFilter>,
    pub category: Option<CategoryFilter>,
    pub sort: Option<SortKey>,
}

pub async fn list(cfg: &Config, args: ListArgs) -> Result<()> {
    let mut c = open_signed_in(cfg).await?;
    let view = &mut c.state_mut().view;
    if let Some(s) = args.status {
        view.status = s;
    }
    if let Some(cat) = args.category {
        view.category = cat;
    }
    if let Some(k) = args.sort {
        view.sort = k;
    }

    let state = c.state();
    let visible = state.visible_tasks();
    println!(
        "status: {} | category: {} | sort: {}",
        state.view.status.label(),
        state.view.category,
        state.view.sort.label()
    );
    if visible.is_empty() {
        println!("(no tasks)");
        return Ok(());
    }
    for t in visible {
        println!("{}", format_row(t));
    }
    Ok(())
}

fn format_row(t: &Task) -> String {
    let id: String = t.id.as_str().chars().take(SHORT_ID).collect();
    format!(
        "{id:<8}  [{}] {:<32}  {:<8}  {:<6}  {}",
        if t.completed { "x" } else { " " },
        t.text,
        t.category.label(),
        t.priority.label(),
        format_due_date(t.due_date),
    )
}

pub async fn add(
    cfg: &Config,
    text: String,
    category: Option<Category>,
    priority: Option<Priority>,
    due: Option<String>,
) -> Result<()> {
    let mut draft = TaskDraft::new(text);
    if let Some(cat) = category {
        draft.category = cat;
    }
    if let Some(p) = priority {
        draft.priority = p;
    }
    if let Some(d) = due {
        draft.due_date = parse_due_date(&d).context("--due")?;
    }
    if draft.trimmed_text().is_none() {
        bail!("task text cannot be empty");
    }

    let mut c = open_signed_in(cfg).await?;
    let before = c.state().board.len();
    c.state_mut().form = draft;
    c.send(Command::Create).await;
    check_feedback(&c)?;
    if c.state().board.len() == before {
        bail!("task was not added");
    }
    if let Some(t) = c.state().board.tasks().first() {
        println!("Added {}", format_row(t));
    }
    Ok(())
}

pub async fn toggle(cfg: &Config, id: String) -> Result<()> {
    let mut c = open_signed_in(cfg).await?;
    let id = resolve(&c, &id)?;
    c.send(Command::Toggle(id.clone())).await;
    check_feedback(&c)?;
    if let Some(t) = c.state().board.get(&id) {
        println!("{}", format_row(t));
    }
    Ok(())
}

pub async fn remove(cfg: &Config, id: String) -> Result<()> {
    let mut c = open_signed_in(cfg).await?;
    let id = resolve(&c, &id)?;
    let text = c.state().board.get(&id).map(|t| t.text.clone()).unwrap_or_default();
    c.send(Command::Delete(id)).await;
    check_feedback(&c)?;
    println!("Deleted \"{text}\"");
    Ok(())
}

#[derive(Debug, Default)]
pub struct EditArgs {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub due: Option<String>,
    pub clear_due: bool,
}

impl EditArgs {
    fn due_date(&self) -> Result<Option<Option<chrono::NaiveDate>>> {
        if self.clear_due {
            return Ok(Some(None));
        }
        match &self.due {
            Some(d) => Ok(Some(parse_due_date(d).context("--due")?)),
            None => Ok(None),
        }
    }

    /// A lone category, priority or date change goes through a single-field edit.
    fn single_field(&self) -> Result<Option<FieldValue>> {
        if self.text.is_some() {
            return Ok(None);
        }
        let due = self.due_date()?;
        let value = match (self.category, self.priority, due) {
            (Some(c), None, None) => Some(FieldValue::Category(c)),
            (None, Some(p), None) => Some(FieldValue::Priority(p)),
            (None, None, Some(d)) => Some(FieldValue::DueDate(d)),
            _ => None,
        };
        Ok(value)
    }
}

pub async fn edit(cfg: &Config, id: String, args: EditArgs) -> Result<()> {
    let due = args.due_date()?;
    if args.text.is_none() && args.category.is_none() && args.priority.is_none() && due.is_none() {
        bail!("nothing to change (pass --text, --category, --priority, --due or --clear-due)");
    }

    let mut c = open_signed_in(cfg).await?;
    let id = resolve(&c, &id)?;

    if let Some(value) = args.single_field()? {
        c.send(Command::BeginFieldEdit(id.clone(), value.field())).await;
        c.send(Command::SetFieldDraft(value)).await;
        c.send(Command::SaveFieldEdit).await;
    } else {
        c.send(Command::BeginRowEdit(id.clone())).await;
        if let Some(row) = c.state_mut().board.edits_mut().row_mut() {
            let draft = &mut row.draft;
            if let Some(text) = &args.text {
                draft.text = text.clone();
            }
            if let Some(cat) = args.category {
                draft.category = cat;
            }
            if let Some(p) = args.priority {
                draft.priority = p;
            }
            if let Some(d) = due {
                draft.due_date = d;
            }
        }
        c.send(Command::SaveRowEdit).await;
        if c.state().board.edits().row().is_some() {
            check_feedback(&c)?;
            bail!("task text cannot be empty");
        }
    }
    check_feedback(&c)?;

    if let Some(t) = c.state().board.get(&id) {
        println!("{}", format_row(t));
    }
    Ok(())
}

pub async fn stats(cfg: &Config) -> Result<()> {
    let c = open_signed_in(cfg).await?;
    let state = c.state();
    let s = state.stats();
    println!("Total:     {}", s.total);
    println!("Completed: {}", s.completed);
    println!("Pending:   {}", s.pending);
    println!("Progress:  {}%", s.percent);
    println!();
    for (cat, cs) in state.category_stats() {
        println!(
            "{:<9} {:>3}/{:<3} {:>3}%",
            cat.label(),
            cs.completed,
            cs.total,
            cs.percent()
        );
    }
    Ok(())
}
