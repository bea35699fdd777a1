pub mod export;
pub mod itinerary;
pub mod storage;
pub mod time;
