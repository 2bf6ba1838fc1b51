//! services/api/src/web/schedule.rs
//!
//! REST handlers for the weekly study timetable.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use qalamflow_core::domain::{NewSchedule, ScheduleChanges, ScheduleEntry};
use qalamflow_core::library;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::MessageResponse;
use crate::web::state::AppState;
use crate::web::{parse_field, port_error};

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub id: Uuid,
    /// Lowercase English weekday, e.g. `monday`.
    pub day_of_week: String,
    /// `HH:MM`, 24h clock.
    pub time: String,
    pub activity: String,
    pub book_id: Option<Uuid>,
}

impl From<ScheduleEntry> for ScheduleResponse {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            id: entry.id,
            day_of_week: entry.day_of_week.as_str().to_string(),
            time: entry.time,
            activity: entry.activity,
            book_id: entry.book_id,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub day_of_week: String,
    pub time: String,
    pub activity: String,
    pub book_id: Option<Uuid>,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    pub day_of_week: Option<String>,
    pub time: Option<String>,
    pub activity: Option<String>,
    /// Omit to keep the current book, send `null` to unlink it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Uuid>)]
    pub book_id: Option<Option<Uuid>>,
}

/// Distinguishes an explicit `null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateScheduleRequest {
    fn into_domain(self) -> Result<ScheduleChanges, (StatusCode, String)> {
        Ok(ScheduleChanges {
            day_of_week: self.day_of_week.as_deref().map(parse_field).transpose()?,
            time: self.time,
            activity: self.activity,
            book_id: self.book_id,
        })
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// The user's timetable ordered by weekday, then time.
#[utoipa::path(
    get,
    path = "/api/schedule",
    tag = "schedule",
    responses((status = 200, description = "All schedule slots", body = [ScheduleResponse]))
)]
pub async fn list_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let slots = state
        .db
        .list_schedule(user_id)
        .await
        .map_err(|e| port_error("Schedule", e))?;
    Ok(Json(slots.into_iter().map(ScheduleResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    get,
    path = "/api/schedule/{id}",
    tag = "schedule",
    params(("id" = Uuid, Path, description = "Schedule slot id")),
    responses(
        (status = 200, description = "The slot", body = ScheduleResponse),
        (status = 404, description = "Schedule not found")
    )
)]
pub async fn get_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(schedule_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let slot = state
        .db
        .find_schedule(user_id, schedule_id)
        .await
        .map_err(|e| port_error("Schedule", e))?;
    Ok(Json(ScheduleResponse::from(slot)))
}

#[utoipa::path(
    post,
    path = "/api/schedule",
    tag = "schedule",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Slot created", body = ScheduleResponse),
        (status = 400, description = "Invalid slot"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let entry = NewSchedule {
        day_of_week: parse_field(&req.day_of_week)?,
        time: req.time,
        activity: req.activity,
        book_id: req.book_id,
    };
    let created = library::add_schedule(state.db.as_ref(), user_id, entry)
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok((StatusCode::CREATED, Json(ScheduleResponse::from(created))))
}

#[utoipa::path(
    put,
    path = "/api/schedule/{id}",
    tag = "schedule",
    params(("id" = Uuid, Path, description = "Schedule slot id")),
    request_body = UpdateScheduleRequest,
    responses(
        (status = 200, description = "Slot updated", body = ScheduleResponse),
        (status = 400, description = "Invalid change"),
        (status = 404, description = "Schedule or book not found")
    )
)]
pub async fn update_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(schedule_id): Path<Uuid>,
    Json(req): Json<UpdateScheduleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let updated =
        library::edit_schedule(state.db.as_ref(), user_id, schedule_id, req.into_domain()?)
            .await
            .map_err(|e| port_error("Schedule", e))?;
    Ok(Json(ScheduleResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/schedule/{id}",
    tag = "schedule",
    params(("id" = Uuid, Path, description = "Schedule slot id")),
    responses(
        (status = 200, description = "Slot deleted", body = MessageResponse),
        (status = 404, description = "Schedule not found")
    )
)]
pub async fn delete_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(schedule_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_schedule(user_id, schedule_id)
        .await
        .map_err(|e| port_error("Schedule", e))?;
    Ok(Json(MessageResponse::new("Schedule deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qalamflow_core::domain::DayOfWeek;

    #[test]
    fn test_update_distinguishes_null_from_missing_book() {
        let keep: UpdateScheduleRequest = serde_json::from_str(r#"{"time":"06:30"}"#).unwrap();
        assert_eq!(keep.book_id, None);

        let unlink: UpdateScheduleRequest = serde_json::from_str(r#"{"bookId":null}"#).unwrap();
        assert_eq!(unlink.book_id, Some(None));

        let id = Uuid::new_v4();
        let relink: UpdateScheduleRequest =
            serde_json::from_str(&format!(r#"{{"bookId":"{}"}}"#, id)).unwrap();
        assert_eq!(relink.book_id, Some(Some(id)));
    }

    #[test]
    fn test_update_parses_weekday() {
        let req: UpdateScheduleRequest =
            serde_json::from_str(r#"{"dayOfWeek":"friday"}"#).unwrap();
        let changes = req.into_domain().unwrap();
        assert_eq!(changes.day_of_week, Some(DayOfWeek::Friday));

        let req: UpdateScheduleRequest =
            serde_json::from_str(r#"{"dayOfWeek":"someday"}"#).unwrap();
        assert!(req.into_domain().is_err());
    }

    #[test]
    fn test_schedule_response_shape() {
        let body = serde_json::to_value(ScheduleResponse::from(ScheduleEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            day_of_week: DayOfWeek::Monday,
            time: "07:00".to_string(),
            activity: "Nahw revision".to_string(),
            book_id: None,
        }))
        .unwrap();
        assert_eq!(body["dayOfWeek"], "monday");
        assert!(body["bookId"].is_null());
    }
}
