use chrono_tz::Tz;

use crate::{models::trip::Record, services::time::format_for_display};

/// One table row, already formatted for the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRow {
    pub position: usize,
    pub index: usize,
    pub train: String,
    pub origin: String,
    pub destination: String,
    pub depart: String,
    pub arrive: String,
    pub notes: String,
}

/// Rebuilds every row from scratch, in list order. The delete index is the
/// row's current position, so it stays correct after earlier deletions.
/// Stored elements that are not well-formed trips show their readable
/// fields and blanks elsewhere.
pub fn rows(trips: &[Record], display: Tz) -> Vec<TripRow> {
    trips
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let trip = record.view();
            TripRow {
                position: index + 1,
                index,
                train: trip.train.clone(),
                origin: trip.origin.clone(),
                destination: trip.destination.clone(),
                depart: format_for_display(trip.depart.instant.get(), display),
                arrive: format_for_display(trip.arrive.instant.get(), display),
                notes: trip.notes.clone(),
            }
        })
        .collect()
}
