use crate::goals::CalculatedGoals;
use crate::tracker::{MetricMap, WeeklyTracker};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

/// Demographic snapshot the goal calculator reads. Every field is optional;
/// an incomplete profile yields fallback goals rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Profile {
    pub age: Option<f64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub gender: Option<Gender>,
    pub activity_level: Option<ActivityLevel>,
    #[serde(default)]
    pub health_conditions: BTreeSet<String>,
    #[serde(default)]
    pub fitness_goals: BTreeSet<String>,
}

impl Profile {
    pub fn has_health_condition(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.health_conditions.contains(*tag))
    }

    pub fn has_fitness_goal(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.fitness_goals.contains(*tag))
    }
}

/// Previously stored nutrition targets, used as fallback goals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Preferences {
    pub calorie_goal: Option<u32>,
    pub protein_goal: Option<u32>,
    pub carb_goal: Option<u32>,
    pub fat_goal: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserRecord {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    pub trackers: BTreeMap<String, WeeklyTracker>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct MetricProgress {
    pub current: f64,
    pub target: u32,
    pub percentage: u8,
    pub daily_completions: [bool; 7],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserGoalsSummary {
    pub daily_calories: u32,
    pub daily_protein: u32,
    pub daily_water: u32,
    pub weekly_exercise: u32,
    pub calculated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub week_start_date: Option<String>,
    pub today_index: usize,
    pub today_goals: MetricMap<bool>,
    pub weekly_progress: MetricMap<MetricProgress>,
    pub today_contributions: MetricMap<f64>,
    pub user_goals: UserGoalsSummary,
}

#[derive(Debug, Serialize)]
pub struct AppliedGoalsResponse {
    pub preferences: Preferences,
    pub calculated_goals: CalculatedGoals,
}
