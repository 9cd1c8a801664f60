use crate::errors::AppError;
use crate::goals::{CalculatedGoals, apply_calculated_goals, calculate_user_goals};
use crate::models::{
    AppliedGoalsResponse, CompletionRequest, Preferences, Profile, ProgressResponse, UserRecord,
};
use crate::progress::build_progress_at;
use crate::state::AppState;
use crate::tracker::{Metric, daily_contributions};
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{Local, NaiveDate};
use tracing::info;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRecord>, AppError> {
    Ok(Json(state.store.load_profile(&user_id).await?))
}

pub async fn put_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(profile): Json<Profile>,
) -> Result<Json<UserRecord>, AppError> {
    validate_profile(&profile)?;
    let record = state.store.save_profile(&user_id, profile).await?;
    info!("updated profile for {user_id}");
    Ok(Json(record))
}

pub async fn put_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(preferences): Json<Preferences>,
) -> Result<Json<UserRecord>, AppError> {
    let record = state.store.save_preferences(&user_id, preferences).await?;
    Ok(Json(record))
}

pub async fn get_goals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CalculatedGoals>, AppError> {
    Ok(Json(goals_for(&state, &user_id).await))
}

pub async fn apply_goals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<AppliedGoalsResponse>, AppError> {
    let calculated_goals = goals_for(&state, &user_id).await;
    let record = state
        .store
        .modify_user(&user_id, |record| {
            apply_calculated_goals(&mut record.preferences, &calculated_goals)
        })
        .await?;

    info!(
        "applied goals for {user_id}: {} kcal, calculated={}",
        calculated_goals.calories_kcal, calculated_goals.is_calculated
    );
    Ok(Json(AppliedGoalsResponse {
        preferences: record.preferences,
        calculated_goals,
    }))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProgressResponse>, AppError> {
    let today = today();
    let goals = goals_for(&state, &user_id).await;
    let tracker = state.store.current_tracker(&user_id, today).await?;
    Ok(Json(build_progress_at(today, &tracker, &goals)))
}

pub async fn complete_goal(
    State(state): State<AppState>,
    Path((user_id, metric)): Path<(String, String)>,
    Json(payload): Json<CompletionRequest>,
) -> Result<Json<ProgressResponse>, AppError> {
    let metric: Metric = metric.trim().parse()?;
    let today = today();
    let goals = goals_for(&state, &user_id).await;
    let contribution = daily_contributions(&goals)[metric];

    let (tracker, changed) = state
        .store
        .update_tracker(&user_id, today, |tracker| {
            tracker.apply_goal_completion(metric, payload.completed, contribution, today)
        })
        .await?;

    if changed {
        info!(
            "{user_id} set {metric} completed={} ({contribution:+} toward week)",
            payload.completed
        );
    }
    Ok(Json(build_progress_at(today, &tracker, &goals)))
}

async fn goals_for(state: &AppState, user_id: &str) -> CalculatedGoals {
    let record = state.store.load_profile_or_default(user_id).await;
    calculate_user_goals(&record.profile, &record.preferences)
}

fn validate_profile(profile: &Profile) -> Result<(), AppError> {
    let fields = [
        ("age", profile.age),
        ("height_cm", profile.height_cm),
        ("weight_kg", profile.weight_kg),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::bad_request(format!("{name} must be a non-negative number")));
            }
        }
    }
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
