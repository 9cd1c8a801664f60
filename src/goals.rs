//! Personalized daily nutrition, hydration and weekly exercise targets.
//!
//! Energy needs follow the Harris-Benedict equation scaled by an activity
//! multiplier, then shifted by fitness goals. Macros come from a calorie split
//! that health conditions may override. Everything here is pure; callers hand
//! in a [`Profile`] snapshot and get back a [`CalculatedGoals`] that is always
//! usable, falling back to stored preferences when the profile is incomplete.

use crate::models::{ActivityLevel, Gender, Preferences, Profile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

pub const MIN_DAILY_CALORIES: i64 = 1200;
pub const MIN_WEEKLY_EXERCISE_MINUTES: i32 = 150;
pub const ML_PER_GLASS: f64 = 250.0;

const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_CARBS: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;

pub const DEFAULT_CALORIES: u32 = 2000;
pub const DEFAULT_PROTEIN: u32 = 120;
pub const DEFAULT_CARBS: u32 = 250;
pub const DEFAULT_FATS: u32 = 65;
pub const DEFAULT_WATER_GLASSES: u32 = 8;
/// 30 minutes on each of 7 days.
pub const DEFAULT_WEEKLY_EXERCISE: u32 = 210;

const WEIGHT_LOSS: &[&str] = &["weight_loss", "lose_weight"];
const WEIGHT_GAIN: &[&str] = &["weight_gain", "gain_weight"];
const MUSCLE_GAIN: &[&str] = &["muscle_gain", "build_muscle"];
const ATHLETIC: &[&str] = &["athletic_performance"];

const DIABETES: &[&str] = &["diabetes"];
const THYROID: &[&str] = &["thyroid"];
const HIGH_BP: &[&str] = &["high_bp", "high BP"];

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GoalError {
    #[error("missing required demographic data for BMR calculation")]
    MissingProfileData,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    MissingProfileData,
}

/// Inputs echoed back with a calculated result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalAdjustments {
    pub goals: BTreeSet<String>,
    pub filters: BTreeSet<String>,
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculatedGoals {
    pub calories_kcal: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fats_g: u32,
    /// Daily glasses of 250 mL.
    pub water_glasses: u32,
    /// Weekly total.
    pub exercise_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmr_kcal: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tdee_kcal: Option<u32>,
    pub is_calculated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustments: Option<GoalAdjustments>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macros {
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fats_g: u32,
}

fn present(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn round_whole(value: f64) -> u32 {
    // Saturating cast: nonsensical inputs clamp to 0 instead of wrapping.
    value.round() as u32
}

/// Harris-Benedict BMR in kcal/day, rounded. `Other` averages both equations.
pub fn calculate_bmr(
    age: f64,
    height_cm: f64,
    weight_kg: f64,
    gender: Gender,
) -> Result<u32, GoalError> {
    if !present(age) || !present(height_cm) || !present(weight_kg) {
        return Err(GoalError::MissingProfileData);
    }

    let male = 88.362 + 13.397 * weight_kg + 4.799 * height_cm - 5.677 * age;
    let female = 447.593 + 9.247 * weight_kg + 3.098 * height_cm - 4.330 * age;
    let bmr = match gender {
        Gender::Male => male,
        Gender::Female => female,
        Gender::Other => (male + female) / 2.0,
    };

    Ok(round_whole(bmr))
}

pub fn activity_multiplier(level: Option<ActivityLevel>) -> f64 {
    match level {
        Some(ActivityLevel::Sedentary) | None => 1.2,
        Some(ActivityLevel::Light) => 1.375,
        Some(ActivityLevel::Moderate) => 1.55,
        Some(ActivityLevel::Active) => 1.725,
        Some(ActivityLevel::VeryActive) => 1.9,
    }
}

pub fn calculate_tdee(bmr: u32, level: Option<ActivityLevel>) -> u32 {
    round_whole(f64::from(bmr) * activity_multiplier(level))
}

/// Goal adjustments are additive and independent of order; maintenance goals
/// leave TDEE as is. The result never drops below [`MIN_DAILY_CALORIES`].
pub fn adjust_calories_for_goals(tdee: u32, profile: &Profile) -> u32 {
    let mut adjustment: i64 = 0;
    if profile.has_fitness_goal(WEIGHT_LOSS) {
        adjustment -= 500;
    }
    if profile.has_fitness_goal(WEIGHT_GAIN) {
        adjustment += 500;
    }
    if profile.has_fitness_goal(MUSCLE_GAIN) {
        adjustment += 300;
    }

    (i64::from(tdee) + adjustment).max(MIN_DAILY_CALORIES) as u32
}

pub fn calculate_protein_goal(weight_kg: f64, profile: &Profile) -> u32 {
    let mut per_kg = if profile.has_fitness_goal(MUSCLE_GAIN) {
        2.2
    } else if profile.has_fitness_goal(WEIGHT_LOSS) {
        1.6
    } else if profile.has_fitness_goal(ATHLETIC) {
        1.8
    } else {
        0.8
    };

    if matches!(
        profile.activity_level,
        Some(ActivityLevel::Active | ActivityLevel::VeryActive)
    ) {
        per_kg += 0.3;
    }

    round_whole(weight_kg * per_kg)
}

/// Health conditions replace the 25/45/30 split outright. When several apply,
/// the last one checked wins; they are not merged.
pub fn adjust_macros_for_health_conditions(calories: u32, profile: &Profile) -> Macros {
    let (mut protein, mut carbs, mut fat) = (0.25, 0.45, 0.30);

    if profile.has_health_condition(DIABETES) {
        (protein, carbs, fat) = (0.30, 0.35, 0.35);
    }
    if profile.has_health_condition(THYROID) {
        (protein, carbs, fat) = (0.30, 0.40, 0.30);
    }
    if profile.has_health_condition(HIGH_BP) {
        (protein, carbs, fat) = (0.25, 0.45, 0.30);
    }

    let calories = f64::from(calories);
    Macros {
        protein_g: round_whole(calories * protein / KCAL_PER_GRAM_PROTEIN),
        carbs_g: round_whole(calories * carbs / KCAL_PER_GRAM_CARBS),
        fats_g: round_whole(calories * fat / KCAL_PER_GRAM_FAT),
    }
}

/// Weekly minutes, never below the WHO minimum of 150.
pub fn calculate_exercise_goal(profile: &Profile) -> u32 {
    let mut minutes = MIN_WEEKLY_EXERCISE_MINUTES;

    minutes += match profile.activity_level {
        Some(ActivityLevel::Sedentary) | None => 0,
        Some(ActivityLevel::Light) => 30,
        Some(ActivityLevel::Moderate) => 60,
        Some(ActivityLevel::Active) => 90,
        Some(ActivityLevel::VeryActive) => 120,
    };

    if profile.has_health_condition(DIABETES) {
        minutes += 30;
    }
    if profile.has_health_condition(HIGH_BP) {
        minutes += 20;
    }
    if profile.has_health_condition(THYROID) {
        minutes -= 10;
    }

    if profile.has_fitness_goal(&["weight_loss"]) {
        minutes += 60;
    }
    if profile.has_fitness_goal(&["muscle_gain"]) {
        minutes += 90;
    }
    if profile.has_fitness_goal(ATHLETIC) {
        minutes += 120;
    }

    minutes.max(MIN_WEEKLY_EXERCISE_MINUTES) as u32
}

/// Daily glasses: 35 mL per kg plus activity and goal bonuses.
pub fn calculate_water_goal(weight_kg: f64, profile: &Profile) -> u32 {
    let mut ml = weight_kg * 35.0;

    ml += match profile.activity_level {
        Some(ActivityLevel::Sedentary) | None => 0.0,
        Some(ActivityLevel::Light) => 250.0,
        Some(ActivityLevel::Moderate) => 500.0,
        Some(ActivityLevel::Active) => 750.0,
        Some(ActivityLevel::VeryActive) => 1000.0,
    };

    if profile.has_fitness_goal(&["weight_loss"]) {
        ml += 250.0;
    }
    if profile.has_fitness_goal(&["muscle_gain"]) {
        ml += 500.0;
    }

    round_whole(ml / ML_PER_GLASS)
}

/// A stored goal of 0 counts as unset.
fn stored_or(goal: Option<u32>, default: u32) -> u32 {
    goal.filter(|value| *value > 0).unwrap_or(default)
}

pub fn fallback_goals(preferences: &Preferences) -> CalculatedGoals {
    CalculatedGoals {
        calories_kcal: stored_or(preferences.calorie_goal, DEFAULT_CALORIES),
        protein_g: stored_or(preferences.protein_goal, DEFAULT_PROTEIN),
        carbs_g: stored_or(preferences.carb_goal, DEFAULT_CARBS),
        fats_g: stored_or(preferences.fat_goal, DEFAULT_FATS),
        water_glasses: DEFAULT_WATER_GLASSES,
        exercise_minutes: DEFAULT_WEEKLY_EXERCISE,
        bmr_kcal: None,
        tdee_kcal: None,
        is_calculated: false,
        reason: Some(FallbackReason::MissingProfileData),
        adjustments: None,
    }
}

/// Computes every target for `profile`. Never fails: an incomplete profile
/// degrades to [`fallback_goals`].
pub fn calculate_user_goals(profile: &Profile, preferences: &Preferences) -> CalculatedGoals {
    match try_calculate(profile) {
        Ok(goals) => goals,
        Err(err) => {
            debug!("using fallback goals: {err}");
            fallback_goals(preferences)
        }
    }
}

fn try_calculate(profile: &Profile) -> Result<CalculatedGoals, GoalError> {
    let (Some(age), Some(height_cm), Some(weight_kg), Some(gender), Some(activity_level)) = (
        profile.age,
        profile.height_cm,
        profile.weight_kg,
        profile.gender,
        profile.activity_level,
    ) else {
        return Err(GoalError::MissingProfileData);
    };

    let bmr = calculate_bmr(age, height_cm, weight_kg, gender)?;
    let tdee = calculate_tdee(bmr, Some(activity_level));
    let calories = adjust_calories_for_goals(tdee, profile);
    let goal_protein = calculate_protein_goal(weight_kg, profile);
    let macros = adjust_macros_for_health_conditions(calories, profile);

    Ok(CalculatedGoals {
        calories_kcal: calories,
        // Muscle-building targets can exceed the macro split.
        protein_g: goal_protein.max(macros.protein_g),
        carbs_g: macros.carbs_g,
        fats_g: macros.fats_g,
        water_glasses: calculate_water_goal(weight_kg, profile),
        exercise_minutes: calculate_exercise_goal(profile),
        bmr_kcal: Some(bmr),
        tdee_kcal: Some(tdee),
        is_calculated: true,
        reason: None,
        adjustments: Some(GoalAdjustments {
            goals: profile.fitness_goals.clone(),
            filters: profile.health_conditions.clone(),
            activity_level,
        }),
    })
}

/// Copies calculated nutrition targets into stored preferences.
pub fn apply_calculated_goals(preferences: &mut Preferences, goals: &CalculatedGoals) {
    preferences.calorie_goal = Some(goals.calories_kcal);
    preferences.protein_goal = Some(goals.protein_g);
    preferences.carb_goal = Some(goals.carbs_g);
    preferences.fat_goal = Some(goals.fats_g);
}
