use std::sync::Arc;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use taskdeck_core::{
    parse_due_date, Category, Priority, Session, StoreError, Task, TaskDraft, TaskId, TaskPatch, TaskStore,
};

use crate::backend::Backend;

/// A `todos` row as the REST endpoint returns it.
#[derive(Debug, Deserialize)]
struct TaskRow {
    id: serde_json::Value,
    text: String,
    category: String,
    priority: String,
    due_date: Option<String>,
    #[serde(default)]
    completed: bool,
}

impl TaskRow {
    fn into_task(self) -> Result<Task, StoreError> {
        let id = match self.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => return Err(StoreError::Decode(format!("unsupported id {other}"))),
        };
        let decode = |e: taskdeck_core::ParseError| StoreError::Decode(e.to_string());
        Ok(Task {
            id: TaskId::new(id),
            text: self.text,
            category: self.category.parse::<Category>().map_err(decode)?,
            priority: self.priority.parse::<Priority>().map_err(decode)?,
            due_date: match self.due_date.as_deref() {
                Some(d) => parse_due_date(d).map_err(decode)?,
                None => None,
            },
            completed: self.completed,
        })
    }
}

#[derive(Debug, Serialize)]
struct NewRow<'a> {
    text: String,
    category: Category,
    priority: Priority,
    due_date: Option<chrono::NaiveDate>,
    completed: bool,
    user_id: &'a str,
}

impl<'a> NewRow<'a> {
    fn new(draft: &TaskDraft, user_id: &'a str) -> Self {
        Self {
            text: draft.text.trim().to_string(),
            category: draft.category,
            priority: draft.priority,
            due_date: draft.due_date,
            completed: false,
            user_id,
        }
    }
}

fn decode_rows(body: &str) -> Result<Vec<Task>, StoreError> {
    let rows: Vec<TaskRow> = serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))?;
    rows.into_iter().map(TaskRow::into_task).collect()
}

/// `TaskStore` backed by the hosted PostgREST endpoint.
#[derive(Clone)]
pub struct RestStore {
    backend: Arc<Backend>,
}

impl RestStore {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    fn table_url(&self) -> String {
        self.backend.endpoint(&format!("/rest/v1/{}", self.backend.table))
    }

    fn row_url(&self, id: &TaskId) -> String {
        format!("{}?id=eq.{}", self.table_url(), id)
    }

    async fn session(&self) -> Result<Session, StoreError> {
        match self.backend.fresh_session().await {
            Ok(Some(s)) => Ok(s),
            Ok(None) => Err(StoreError::NotAuthenticated),
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<String, StoreError> {
        let resp = req.send().await.map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| StoreError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl TaskStore for RestStore {
    #[tracing::instrument(skip_all)]
    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        let session = self.session().await?;
        let req = self
            .backend
            .http
            .get(format!("{}?select=*&order=created_at.desc", self.table_url()))
            .headers(self.backend.bearer_headers(&session.access_token));
        let body = self.send(req).await?;
        let tasks = decode_rows(&body)?;
        tracing::debug!(count = tasks.len(), "fetched rows");
        Ok(tasks)
    }

    #[tracing::instrument(skip_all)]
    async fn insert(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        let session = self.session().await?;
        let req = self
            .backend
            .http
            .post(self.table_url())
            .headers(self.backend.bearer_headers(&session.access_token))
            .header("Prefer", HeaderValue::from_static("return=representation"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(&NewRow::new(draft, &session.user_id));
        let body = self.send(req).await?;
        decode_rows(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        let session = self.session().await?;
        let req = self
            .backend
            .http
            .patch(self.row_url(id))
            .headers(self.backend.bearer_headers(&session.access_token))
            .json(patch);
        self.send(req).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        let session = self.session().await?;
        let req = self
            .backend
            .http
            .delete(self.row_url(id))
            .headers(self.backend.bearer_headers(&session.access_token));
        self.send(req).await?;
        Ok(())
    }
}
