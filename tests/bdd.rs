use std::{fmt, sync::Arc};

use anyhow::Context;
use chrono::{TimeZone, Utc};
use cucumber::{given, then, when, World as _};
use itinerary::{
    error::AppError,
    models::trip::{Record, TripForm},
    render::rows,
    services::{
        export::read_staged,
        itinerary::Itinerary,
        storage::{FileStore, KeyValueStore, Persistence, DEFAULT_STORAGE_KEY},
        time::{FixedClock, InputZone, TimeZones, DEFAULT_DISPLAY_TZ},
    },
};
use tempfile::TempDir;

#[derive(Debug, cucumber::World, Default)]
struct ItineraryWorld {
    state: Option<TestState>,
    notice: Option<String>,
    export: Option<(String, Vec<u8>)>,
    before_reload: Vec<Record>,
}

impl ItineraryWorld {
    fn state(&mut self) -> &mut TestState {
        self.state
            .as_mut()
            .expect("itinerary must be initialised first")
    }

    fn record(&mut self, outcome: Result<(), AppError>) {
        match outcome {
            Ok(()) => self.notice = None,
            Err(err) if err.is_notice() => self.notice = Some(err.to_string()),
            Err(err) => panic!("unexpected failure: {err}"),
        }
    }
}

struct TestState {
    itinerary: Itinerary,
    root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState")
            .field("trips", &self.itinerary.len())
            .finish()
    }
}

impl TestState {
    fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        std::fs::create_dir_all(root.path().join("exports"))?;
        let itinerary = open(&root);
        Ok(Self { itinerary, root })
    }

    fn store(&self) -> FileStore {
        FileStore::new(self.root.path().join("data"))
    }

    fn reload(&mut self) {
        self.itinerary = open(&self.root);
    }
}

fn open(root: &TempDir) -> Itinerary {
    let zones = TimeZones {
        input: InputZone::Fixed(DEFAULT_DISPLAY_TZ),
        display: DEFAULT_DISPLAY_TZ,
    };
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 5, 23, 7, 9).unwrap());
    let persistence = Persistence::new(
        FileStore::new(root.path().join("data")),
        DEFAULT_STORAGE_KEY,
    );
    Itinerary::open(persistence, zones, Arc::new(clock))
}

#[given("a fresh itinerary")]
async fn given_fresh_itinerary(world: &mut ItineraryWorld) {
    world.state = Some(TestState::new().expect("state"));
    world.notice = None;
    world.export = None;
}

#[given(regex = r"^the stored itinerary contains '(.*)'$")]
async fn given_stored_payload(world: &mut ItineraryWorld, raw: String) {
    world
        .state()
        .store()
        .set(DEFAULT_STORAGE_KEY, &raw)
        .expect("write payload");
}

#[when(
    regex = r#"^I add train "([^"]*)" from "([^"]*)" to "([^"]*)" departing "([^"]*)" "([^"]*)" and arriving "([^"]*)" "([^"]*)"$"#
)]
#[allow(clippy::too_many_arguments)]
async fn when_add_trip(
    world: &mut ItineraryWorld,
    train: String,
    origin: String,
    destination: String,
    depart_date: String,
    depart_time: String,
    arrive_date: String,
    arrive_time: String,
) {
    let form = TripForm {
        train,
        origin,
        destination,
        depart_date,
        depart_time,
        arrive_date,
        arrive_time,
        notes: String::new(),
    };
    let outcome = world.state().itinerary.add(form).map(|_| ());
    world.record(outcome);
}

#[when(regex = r#"^I delete the trip at index "([^"]*)"$"#)]
async fn when_delete(world: &mut ItineraryWorld, raw_index: String) {
    world.state().itinerary.delete(&raw_index);
}

#[when("I reload the itinerary")]
async fn when_reload(world: &mut ItineraryWorld) {
    world.before_reload = world.state().itinerary.trips().to_vec();
    world.state().reload();
}

#[when("I export the itinerary")]
async fn when_export(world: &mut ItineraryWorld) {
    let state = world.state();
    let staging = state.root.path().join("exports");
    let outcome = state
        .itinerary
        .export()
        .and_then(|snapshot| read_staged(&snapshot, &staging));
    match outcome {
        Ok(download) => {
            world.export = Some(download);
            world.notice = None;
        }
        Err(err) => world.record(Err(err)),
    }
}

#[then(regex = r"^the itinerary has (\d+) trips$")]
async fn then_trip_count(world: &mut ItineraryWorld, expected: usize) {
    assert_eq!(world.state().itinerary.len(), expected);
}

#[then(regex = r#"^row (\d+) departs "([^"]*)" and arrives "([^"]*)"$"#)]
async fn then_row_times(world: &mut ItineraryWorld, position: usize, depart: String, arrive: String) {
    let rows = rows(world.state().itinerary.trips(), DEFAULT_DISPLAY_TZ);
    let row = rows
        .iter()
        .find(|row| row.position == position)
        .expect("row should exist");
    assert_eq!(row.depart, depart);
    assert_eq!(row.arrive, arrive);
}

#[then("every trip has resolved instants")]
async fn then_instants_resolved(world: &mut ItineraryWorld) {
    for record in world.state().itinerary.trips() {
        let trip = record.view();
        assert!(!trip.depart.instant.is_empty());
        assert!(!trip.arrive.instant.is_empty());
        assert!(trip.depart.instant.to_string().ends_with('Z'));
    }
}

#[then(regex = r#"^trip (\d+) is train "([^"]*)" from "([^"]*)" to "([^"]*)"$"#)]
async fn then_trip_is(
    world: &mut ItineraryWorld,
    position: usize,
    train: String,
    origin: String,
    destination: String,
) {
    let trip = world.state().itinerary.trips()[position - 1].view().into_owned();
    assert_eq!(trip.train, train);
    assert_eq!(trip.origin, origin);
    assert_eq!(trip.destination, destination);
}

#[then(regex = r#"^stored element (\d+) is still '(.*)'$"#)]
async fn then_stored_element(world: &mut ItineraryWorld, position: usize, expected: String) {
    let raw = world
        .state()
        .store()
        .get(DEFAULT_STORAGE_KEY)
        .expect("read payload")
        .expect("payload exists");
    let stored: serde_json::Value = serde_json::from_str(&raw).expect("stored json");
    let expected: serde_json::Value = serde_json::from_str(&expected).expect("expected json");
    assert_eq!(stored[position - 1], expected);
}

#[then("the reloaded trips equal the ones before the reload")]
async fn then_reload_lossless(world: &mut ItineraryWorld) {
    let before = world.before_reload.clone();
    assert_eq!(world.state().itinerary.trips(), before.as_slice());
}

#[then("no notice is shown")]
async fn then_no_notice(world: &mut ItineraryWorld) {
    assert_eq!(world.notice, None);
}

#[then(regex = r#"^the notice "([^"]*)" is shown$"#)]
async fn then_notice(world: &mut ItineraryWorld, expected: String) {
    assert_eq!(world.notice.as_deref(), Some(expected.as_str()));
}

#[then("no export was produced")]
async fn then_no_export(world: &mut ItineraryWorld) {
    assert!(world.export.is_none());
    then_no_staged_files(world).await;
}

#[then(regex = r#"^the export is named "([^"]*)" and lists (\d+) trips$"#)]
async fn then_export_contents(world: &mut ItineraryWorld, name: String, count: usize) {
    let (file_name, body) = world.export.as_ref().expect("export should exist");
    assert_eq!(file_name, &name);
    let doc: serde_json::Value = serde_json::from_slice(body).expect("export is json");
    assert_eq!(doc["trips"].as_array().map(Vec::len), Some(count));
}

#[then("no staged export files remain")]
async fn then_no_staged_files(world: &mut ItineraryWorld) {
    let staging = world.state().root.path().join("exports");
    let leftovers = std::fs::read_dir(staging).expect("staging dir").count();
    assert_eq!(leftovers, 0);
}

#[tokio::main]
async fn main() {
    ItineraryWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
