use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Intensity assumed for a mood sample logged without one.
pub const NEUTRAL_INTENSITY: i32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MoodSample {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub emotion: String,
    pub reason: Option<String>,
    pub intensity: Option<i32>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MoodSample {
    pub fn effective_intensity(&self) -> f64 {
        f64::from(self.intensity.unwrap_or(NEUTRAL_INTENSITY))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DayRating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rating_date: NaiveDate,
    pub rating: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Victory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub category: String,
    /// Calendar day as `YYYY-MM-DD`.
    pub victory_date: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertMoodRequest {
    #[validate(length(min = 1, max = 40, message = "Emotion must be 1-40 characters"))]
    pub emotion: String,
    #[validate(length(max = 100, message = "Reason too long"))]
    pub reason: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Intensity must be between 1 and 10"))]
    pub intensity: Option<i32>,
    #[validate(length(max = 1000, message = "Note too long"))]
    pub note: Option<String>,
    pub entry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertDayRatingRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 200, message = "Note too long"))]
    pub note: Option<String>,
    pub rating_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVictoryRequest {
    #[validate(length(min = 1, max = 500, message = "Victory text must be 1-500 characters"))]
    pub text: String,
    #[validate(length(min = 1, max = 40, message = "Category must be 1-40 characters"))]
    pub category: Option<String>,
    pub victory_date: Option<NaiveDate>,
}
