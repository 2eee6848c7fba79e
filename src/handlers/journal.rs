use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::models::journal::{
    CreateVictoryRequest, DayRating, MoodSample, UpsertDayRatingRequest, UpsertMoodRequest,
    Victory,
};
use crate::AppState;

const DEFAULT_VICTORY_CATEGORY: &str = "general";

/// Timestamp stored for a record that belongs to `day`. Reports window and
/// bucket by this timestamp, so a backdated record is placed at noon UTC of
/// its own day rather than at the time it was written.
fn logged_at(day: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
    if day == now.date_naive() {
        now
    } else {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&day.and_time(noon))
    }
}

/// One mood sample per user per UTC day; a second write replaces the first.
pub async fn upsert_mood(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertMoodRequest>,
) -> AppResult<Json<MoodSample>> {
    body.validate()?;

    let now = Utc::now();
    let entry_date = body.entry_date.unwrap_or_else(|| now.date_naive());
    let sample = MoodSample {
        id: Uuid::new_v4(),
        user_id: auth_user.id,
        entry_date,
        emotion: body.emotion.trim().to_lowercase(),
        reason: body.reason.filter(|r| !r.trim().is_empty()),
        intensity: body.intensity,
        note: body.note.filter(|n| !n.trim().is_empty()),
        created_at: logged_at(entry_date, now),
    };

    let saved = state.journal.upsert_mood_sample(sample).await?;
    Ok(Json(saved))
}

pub async fn upsert_rating(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertDayRatingRequest>,
) -> AppResult<Json<DayRating>> {
    body.validate()?;

    let now = Utc::now();
    let rating = DayRating {
        id: Uuid::new_v4(),
        user_id: auth_user.id,
        rating_date: body.rating_date.unwrap_or_else(|| now.date_naive()),
        rating: body.rating,
        note: body.note,
        created_at: now,
    };

    let saved = state.journal.upsert_day_rating(rating).await?;
    Ok(Json(saved))
}

pub async fn create_victory(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateVictoryRequest>,
) -> AppResult<(StatusCode, Json<Victory>)> {
    body.validate()?;

    let now = Utc::now();
    let victory_date = body.victory_date.unwrap_or_else(|| now.date_naive());
    let victory = Victory {
        id: Uuid::new_v4(),
        user_id: auth_user.id,
        text: body.text.trim().to_string(),
        category: body
            .category
            .unwrap_or_else(|| DEFAULT_VICTORY_CATEGORY.to_string()),
        victory_date: victory_date.format("%Y-%m-%d").to_string(),
        created_at: logged_at(victory_date, now),
    };

    let saved = state.journal.insert_victory(victory).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}
