use thiserror::Error;

use crate::agenda::model::{Event, EventId, NewEvent};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no event with id {0}")]
pub struct NotFoundError(pub EventId);

// Invariant: `events` stays sorted ascending by time, ties in arrival order.
// Mutations keep the order; reads never touch it.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
    next_id: EventId,
}

impl EventStore {
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|event| event.time);
        let next_id = events
            .iter()
            .map(|event| event.id)
            .max()
            .map_or(1, |max| max + 1);
        Self { events, next_id }
    }

    pub fn list(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn add(&mut self, new: NewEvent) -> &Event {
        let id = self.next_id;
        self.next_id += 1;
        let event = Event {
            id,
            time: new.time,
            title: new.title,
            description: new.description,
            location: new.location,
            category: new.category,
            date: new.date,
        };
        let at = self.insertion_point(event.time);
        self.events.insert(at, event);
        &self.events[at]
    }

    pub fn update(&mut self, id: EventId, new: NewEvent) -> Result<&Event, NotFoundError> {
        let index = self.index_of(id).ok_or(NotFoundError(id))?;
        let time_changed = self.events[index].time != new.time;

        let event = &mut self.events[index];
        event.time = new.time;
        event.title = new.title;
        event.description = new.description;
        event.location = new.location;
        event.category = new.category;
        event.date = new.date;

        if !time_changed {
            return Ok(&self.events[index]);
        }

        let event = self.events.remove(index);
        let at = self.insertion_point(event.time);
        self.events.insert(at, event);
        Ok(&self.events[at])
    }

    pub fn remove(&mut self, id: EventId) -> Result<Event, NotFoundError> {
        let index = self.index_of(id).ok_or(NotFoundError(id))?;
        Ok(self.events.remove(index))
    }

    fn index_of(&self, id: EventId) -> Option<usize> {
        self.events.iter().position(|event| event.id == id)
    }

    // After all entries with an equal time, so ties keep arrival order.
    fn insertion_point(&self, time: crate::clock::ClockTime) -> usize {
        self.events.partition_point(|event| event.time <= time)
    }
}
