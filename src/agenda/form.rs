use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::agenda::model::{Category, Event, EventId, NewEvent};
use crate::agenda::store::{EventStore, NotFoundError};
use crate::clock::{ClockTime, FormatError};
use crate::notify::{Notifier, NotifyHandle};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub time: String,
    pub description: String,
    pub location: String,
    pub category: Category,
    pub date: Option<NaiveDate>,
}

impl EventDraft {
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            time: event.time.storage(),
            description: event.description.clone(),
            location: event.location.clone(),
            category: event.category,
            date: event.date,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("{0}")]
    BadTime(FormatError),
}

impl FieldError {
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::EmptyTitle => "title",
            FieldError::BadTime(_) => "time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {error}", error.field())?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[allow(dead_code)]
pub fn validate(draft: &EventDraft) -> Vec<FieldError> {
    match normalize(draft) {
        Ok(_) => Vec::new(),
        Err(err) => err.errors,
    }
}

// The store only ever sees drafts that made it through here.
fn normalize(draft: &EventDraft) -> Result<NewEvent, ValidationError> {
    let mut errors = Vec::new();
    if draft.title.trim().is_empty() {
        errors.push(FieldError::EmptyTitle);
    }
    let time = match ClockTime::parse(&draft.time) {
        Ok(time) => Some(time),
        Err(err) => {
            errors.push(FieldError::BadTime(err));
            None
        }
    };

    match time {
        Some(time) if errors.is_empty() => Ok(NewEvent {
            time,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            location: draft.location.trim().to_string(),
            category: draft.category,
            date: draft.date,
        }),
        _ => Err(ValidationError { errors }),
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no form is open")]
    Closed,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

#[derive(Debug)]
pub struct Submission {
    pub event: Event,
    // Outstanding while the webhook call is in flight; `None` for edits and
    // when no notifier is configured.
    pub notification: Option<NotifyHandle>,
}

#[derive(Debug, Default)]
pub struct FormSession {
    open: Option<OpenForm>,
}

#[derive(Debug)]
struct OpenForm {
    draft: EventDraft,
    editing: Option<EventId>,
}

impl FormSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    #[allow(dead_code)]
    pub fn editing(&self) -> Option<EventId> {
        self.open.as_ref().and_then(|form| form.editing)
    }

    pub fn open_blank(&mut self) -> &mut EventDraft {
        let form = self.open.insert(OpenForm {
            draft: EventDraft::default(),
            editing: None,
        });
        &mut form.draft
    }

    pub fn open_edit(
        &mut self,
        store: &EventStore,
        id: EventId,
    ) -> Result<&mut EventDraft, NotFoundError> {
        let event = store.get(id).ok_or(NotFoundError(id))?;
        let form = self.open.insert(OpenForm {
            draft: EventDraft::from_event(event),
            editing: Some(id),
        });
        Ok(&mut form.draft)
    }

    #[allow(dead_code)]
    pub fn draft_mut(&mut self) -> Option<&mut EventDraft> {
        self.open.as_mut().map(|form| &mut form.draft)
    }

    pub fn cancel(&mut self) {
        self.open = None;
    }

    pub fn submit(
        &mut self,
        store: &mut EventStore,
        notifier: Option<&Notifier>,
    ) -> Result<Submission, SubmitError> {
        let form = self.open.as_ref().ok_or(SubmitError::Closed)?;
        // Validation short-circuits before the store is touched; an invalid
        // draft never partially mutates the collection.
        let normalized = normalize(&form.draft)?;

        let (event, notification) = match form.editing {
            Some(id) => (store.update(id, normalized)?.clone(), None),
            None => {
                let event = store.add(normalized).clone();
                let notification = notifier.map(|notifier| notifier.dispatch(&event));
                (event, notification)
            }
        };

        self.open = None;
        Ok(Submission {
            event,
            notification,
        })
    }
}
