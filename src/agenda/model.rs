use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::clock::ClockTime;

pub type EventId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Work,
    Personal,
    Important,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
            Category::Important => "important",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub time: ClockTime,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Category,
    pub date: Option<NaiveDate>,
}

// A validated record ready for the store; everything an `Event` has except
// the id, which the store assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub time: ClockTime,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Category,
    pub date: Option<NaiveDate>,
}

pub fn load_agenda(path: &Path) -> Result<Vec<Event>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read agenda file {}", path.display()))?;
    parse_agenda_text(&content)
}

pub fn parse_agenda_text(content: &str) -> Result<Vec<Event>> {
    let raw = serde_json::from_str::<AgendaFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != 1 {
        bail!(
            "unsupported agenda file version {}; expected version 1",
            raw.version
        );
    }

    let mut ids = HashSet::new();
    let mut events = Vec::with_capacity(raw.events.len());
    for entry in raw.events {
        if !ids.insert(entry.id) {
            bail!("duplicate event id found: {}", entry.id);
        }
        if entry.title.trim().is_empty() {
            bail!("event {} must have a non-empty title", entry.id);
        }
        let time = ClockTime::parse(&entry.time)
            .map_err(|err| anyhow::anyhow!("event {}: {err}", entry.id))?;
        let date = match entry.date {
            Some(text) => Some(parse_event_date(&text)?),
            None => None,
        };

        events.push(Event {
            id: entry.id,
            time,
            title: entry.title,
            description: entry.description,
            location: entry.location,
            category: entry.category,
            date,
        });
    }

    Ok(events)
}

pub fn save_agenda(path: &Path, events: &[Event]) -> Result<()> {
    let mut serialized_events = Vec::with_capacity(events.len());
    for event in events {
        let mut event_obj = Map::new();
        event_obj.insert("id".to_string(), Value::Number(event.id.into()));
        event_obj.insert("time".to_string(), Value::String(event.time.storage()));
        event_obj.insert("title".to_string(), Value::String(event.title.clone()));
        if !event.description.is_empty() {
            event_obj.insert(
                "description".to_string(),
                Value::String(event.description.clone()),
            );
        }
        if !event.location.is_empty() {
            event_obj.insert(
                "location".to_string(),
                Value::String(event.location.clone()),
            );
        }
        event_obj.insert(
            "category".to_string(),
            Value::String(event.category.as_str().to_string()),
        );
        if let Some(date) = event.date {
            event_obj.insert(
                "date".to_string(),
                Value::String(date.format("%Y-%m-%d").to_string()),
            );
        }
        serialized_events.push(Value::Object(event_obj));
    }

    let payload = json!({
        "version": 1,
        "events": serialized_events,
    });
    let text = serde_json::to_string_pretty(&payload)?;
    fs::write(path, format!("{text}\n"))
        .with_context(|| format!("unable to write agenda file {}", path.display()))?;
    Ok(())
}

fn parse_event_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{input}', expected YYYY-MM-DD"))
}

#[derive(Debug, Deserialize)]
struct AgendaFile {
    version: u32,
    events: Vec<EventFile>,
}

#[derive(Debug, Deserialize)]
struct EventFile {
    id: EventId,
    time: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    category: Category,
    #[serde(default)]
    date: Option<String>,
}
