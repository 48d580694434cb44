//! HTTP routes.
//!
//! The auth endpoints (/connect, /callback, /refresh) mirror the provider
//! redirect flow and answer in plain text; /revoke and the calendar
//! passthroughs answer with the JSON envelope.

use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use calbridge_google::{CalendarListEntry, Event, EventTime};

use crate::error::ServerError;
use crate::response::{ApiResponse, JsonFailure, TextFailure};
use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/connect", get(connect))
        .route("/callback", get(callback))
        .route("/refresh", get(refresh))
        .route("/revoke", get(revoke))
        .route("/add-event", get(add_event))
        .route("/calendar-list", get(calendar_list))
        .route("/events", get(list_events))
        .route(
            "/event/{id}",
            get(get_event).post(update_event).delete(delete_event),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshParams {
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RevokeParams {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarParams {
    calendar_id: Option<String>,
}

impl CalendarParams {
    fn calendar_id<'a>(&'a self, state: &'a AppState) -> &'a str {
        self.calendar_id.as_deref().unwrap_or(&state.config.calendar_id)
    }
}

/// GET /connect: send the user to the provider consent page.
async fn connect(State(state): State<AppState>) -> Result<Redirect, TextFailure> {
    let url = state
        .session
        .oauth()
        .consent_url(&state.config.scopes, state.config.offline_access)?;
    info!("redirecting to consent page");
    Ok(Redirect::temporary(url.as_str()))
}

/// GET /callback?code=: redeem the authorization code and persist tokens.
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<String, TextFailure> {
    let code = params
        .code
        .ok_or_else(|| ServerError::missing_param("code"))?;
    state.session.exchange_and_store(&code).await?;
    info!("authorization code exchanged; token persisted");
    Ok("Authentication successful!".to_string())
}

/// GET /refresh?refresh_token=: exchange a refresh token for a new access
/// token and persist it.
async fn refresh(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> Result<String, TextFailure> {
    let refresh_token = params
        .refresh_token
        .ok_or_else(|| ServerError::missing_param("refresh_token"))?;
    state.session.refresh_and_store(&refresh_token).await?;
    Ok("Refresh token successful!".to_string())
}

/// GET /revoke?access_token=: revoke the grant and clear the stored token.
async fn revoke(
    State(state): State<AppState>,
    Query(params): Query<RevokeParams>,
) -> Result<Json<ApiResponse<()>>, JsonFailure> {
    let access_token = params
        .access_token
        .ok_or_else(|| ServerError::missing_param("access_token"))?;
    state.session.revoke_and_clear(&access_token).await?;
    Ok(Json(ApiResponse::ok_empty(
        "Access token revoked successfully.",
    )))
}

/// GET /add-event: insert the fixed demo event into the default calendar.
async fn add_event(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Event>>, JsonFailure> {
    let record = state.session.ensure_valid_token().await?;
    let client = state.calendar_client(&record)?;
    let created = client
        .insert_event(&state.config.calendar_id, &demo_event())
        .await?;
    Ok(Json(ApiResponse::ok("Event added successfully.", created)))
}

/// GET /calendar-list: list the calendars visible to the user.
async fn calendar_list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CalendarListEntry>>>, JsonFailure> {
    let record = state.session.ensure_valid_token().await?;
    let client = state.calendar_client(&record)?;
    let calendars = client.list_calendars().await?;
    Ok(Json(ApiResponse::ok(
        "Calendar list fetched successfully.",
        calendars,
    )))
}

/// GET /events: list events from a calendar.
async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<ApiResponse<Vec<Event>>>, JsonFailure> {
    let record = state.session.ensure_valid_token().await?;
    let client = state.calendar_client(&record)?;
    let events = client.list_events(params.calendar_id(&state)).await?;
    Ok(Json(ApiResponse::ok(
        "Events fetched successfully.",
        events,
    )))
}

/// GET /event/{id}: fetch a single event.
async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<ApiResponse<Event>>, JsonFailure> {
    let record = state.session.ensure_valid_token().await?;
    let client = state.calendar_client(&record)?;
    let event = client.get_event(params.calendar_id(&state), &id).await?;
    Ok(Json(ApiResponse::ok("Event fetched successfully.", event)))
}

/// POST /event/{id}: apply a partial update to an event.
async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<CalendarParams>,
    Json(patch): Json<Event>,
) -> Result<Json<ApiResponse<Event>>, JsonFailure> {
    let record = state.session.ensure_valid_token().await?;
    let client = state.calendar_client(&record)?;
    let updated = client
        .patch_event(params.calendar_id(&state), &id, &patch)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Event updated successfully.",
        updated,
    )))
}

/// DELETE /event/{id}: delete an event.
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<ApiResponse<()>>, JsonFailure> {
    let record = state.session.ensure_valid_token().await?;
    let client = state.calendar_client(&record)?;
    client
        .delete_event(params.calendar_id(&state), &id)
        .await?;
    Ok(Json(ApiResponse::ok_empty("Event deleted successfully.")))
}

/// The fixed demo payload served by /add-event.
fn demo_event() -> Event {
    Event {
        summary: Some("Google I/O 2021".to_string()),
        location: Some("800 Howard St., San Francisco, CA 94103".to_string()),
        description: Some(
            "A chance to hear more about Google's developer products.".to_string(),
        ),
        start: Some(EventTime {
            date_time: Some("2023-06-15T09:00:00-07:00".to_string()),
            time_zone: Some("America/Los_Angeles".to_string()),
            ..EventTime::default()
        }),
        end: Some(EventTime {
            date_time: Some("2023-05-16T17:00:00-07:00".to_string()),
            time_zone: Some("America/Los_Angeles".to_string()),
            ..EventTime::default()
        }),
        recurrence: Some(vec!["RRULE:FREQ=DAILY;COUNT=2".to_string()]),
        ..Event::default()
    }
}
