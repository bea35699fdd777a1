use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};

use crate::{
    error::AppError,
    models::trip::TripForm,
    render::{rows, TripRow},
    services::{export::read_staged, itinerary::Itinerary},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(itinerary_page))
        .route("/trips", post(add_trip))
        .route("/trips/:index/delete", post(delete_trip))
        .route("/export", get(export_trips))
}

#[derive(Template)]
#[template(path = "itinerary.html")]
struct ItineraryTemplate {
    rows: Vec<TripRow>,
    display_zone: String,
    show_notice: bool,
    notice: String,
    form: TripForm,
}

fn render_page(itinerary: &Itinerary, notice: Option<String>, form: TripForm) -> Response {
    let display = itinerary.zones().display;
    let show_notice = notice.is_some();
    let page = ItineraryTemplate {
        rows: rows(itinerary.trips(), display),
        display_zone: display.name().to_string(),
        show_notice,
        notice: notice.unwrap_or_default(),
        form,
    };
    if show_notice {
        (
            StatusCode::BAD_REQUEST,
            AskamaTemplateResponse::into_response(page),
        )
            .into_response()
    } else {
        AskamaTemplateResponse::into_response(page)
    }
}

async fn itinerary_page(State(state): State<AppState>) -> Response {
    let itinerary = state.itinerary.lock().await;
    render_page(&itinerary, None, TripForm::default())
}

/// Runs `op` on the blocking pool with the itinerary locked. Mutations and
/// exports touch the filesystem, so they stay off the async workers.
async fn with_itinerary<T>(
    state: &AppState,
    op: impl FnOnce(&mut Itinerary) -> T + Send + 'static,
) -> Result<T, AppError>
where
    T: Send + 'static,
{
    let mut itinerary = state.itinerary.clone().lock_owned().await;
    tokio::task::spawn_blocking(move || op(&mut *itinerary))
        .await
        .map_err(|err| AppError::Other(err.into()))
}

async fn add_trip(
    State(state): State<AppState>,
    Form(form): Form<TripForm>,
) -> Result<Response, AppError> {
    with_itinerary(&state, move |itinerary| {
        match itinerary.add(form.clone()).map(|_| ()) {
            // Redirecting clears the form and redraws from the stored list.
            Ok(_) => Ok(Redirect::to("/").into_response()),
            Err(err) if err.is_notice() => {
                Ok(render_page(itinerary, Some(err.to_string()), form))
            }
            Err(err) => Err(err),
        }
    })
    .await?
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(index): Path<String>,
) -> Result<Redirect, AppError> {
    with_itinerary(&state, move |itinerary| itinerary.delete(&index)).await?;
    Ok(Redirect::to("/"))
}

async fn export_trips(State(state): State<AppState>) -> Result<Response, AppError> {
    let export_dir = state.config.export_dir.clone();
    with_itinerary(&state, move |itinerary| {
        let snapshot = match itinerary.export() {
            Ok(snapshot) => snapshot,
            Err(err) if err.is_notice() => {
                return Ok(render_page(itinerary, Some(err.to_string()), TripForm::default()))
            }
            Err(err) => return Err(err),
        };
        let (file_name, body) = read_staged(&snapshot, &export_dir)?;
        Ok((
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            body,
        )
            .into_response())
    })
    .await?
}
