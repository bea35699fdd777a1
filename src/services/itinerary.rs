use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    error::AppError,
    models::trip::{Instant, Record, Stamp, Trip, TripForm},
    services::{
        export::{export_snapshot, Snapshot},
        storage::Persistence,
        time::{to_instant, Clock, InputZone, TimeZones},
    },
};

/// Owns the trip list and every path that mutates it.
pub struct Itinerary {
    trips: Vec<Record>,
    persistence: Persistence,
    zones: TimeZones,
    clock: Arc<dyn Clock>,
}

impl Itinerary {
    /// Restores whatever the store holds and takes ownership of it.
    pub fn open(persistence: Persistence, zones: TimeZones, clock: Arc<dyn Clock>) -> Self {
        let trips = persistence.load();
        info!(count = trips.len(), key = persistence.key(), "itinerary loaded");
        Self {
            trips,
            persistence,
            zones,
            clock,
        }
    }

    pub fn trips(&self) -> &[Record] {
        &self.trips
    }

    pub fn zones(&self) -> TimeZones {
        self.zones
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Validates the form and appends the new trip at the end.
    pub fn add(&mut self, form: TripForm) -> Result<Trip, AppError> {
        let train = required(&form.train, "train")?;
        let origin = required(&form.origin, "origin")?;
        let destination = required(&form.destination, "destination")?;

        let trip = Trip {
            train,
            origin,
            destination,
            depart: stamp(form.depart_date, form.depart_time, self.zones.input),
            arrive: stamp(form.arrive_date, form.arrive_time, self.zones.input),
            notes: form.notes.trim().to_string(),
            created_at: Instant::new(self.clock.now()),
        };
        info!(train = %trip.train, origin = %trip.origin, destination = %trip.destination, "trip added");

        self.trips.push(Record::Trip(trip.clone()));
        self.persistence.save(&self.trips);
        Ok(trip)
    }

    /// Deletes by the index a rendered row carried. Anything that is not an
    /// in-range non-negative integer is ignored.
    pub fn delete(&mut self, raw_index: &str) -> Option<Record> {
        match raw_index.trim().parse::<usize>() {
            Ok(index) => self.delete_at(index),
            Err(_) => {
                debug!(raw_index, "ignoring malformed delete index");
                None
            }
        }
    }

    pub fn delete_at(&mut self, index: usize) -> Option<Record> {
        if index >= self.trips.len() {
            debug!(index, len = self.trips.len(), "ignoring out-of-range delete");
            return None;
        }
        let removed = self.trips.remove(index);
        info!(index, train = %removed.view().train, "trip deleted");
        self.persistence.save(&self.trips);
        Some(removed)
    }

    pub fn export(&self) -> Result<Snapshot, AppError> {
        export_snapshot(&self.trips, self.clock.now(), self.zones.display)
    }
}

fn required(value: &str, field: &'static str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn stamp(date: String, time: String, zone: InputZone) -> Stamp {
    let instant = to_instant(&date, &time, zone).into();
    Stamp {
        date,
        time,
        instant,
    }
}
