use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use taskdeck_core::Session;

pub fn taskdeck_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TASKDECK_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".taskdeck"))
}

pub fn ensure_taskdeck_home() -> Result<PathBuf> {
    let dir = taskdeck_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn session_path() -> Result<PathBuf> {
    Ok(ensure_taskdeck_home()?.join("session.json"))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(ensure_taskdeck_home()?.join("taskdeck.log"))
}

pub fn load_session() -> Result<Option<Session>> {
    let p = session_path()?;
    if !p.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(Some(serde_json::from_str(&s).context("parse session.json")?))
}

pub fn save_session(session: &Session) -> Result<()> {
    let p = session_path()?;
    let s = serde_json::to_string_pretty(session)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn clear_session() -> Result<()> {
    let p = session_path()?;
    if p.exists() {
        fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
    }
    Ok(())
}
