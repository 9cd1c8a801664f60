//! One user's in-progress tracking week.
//!
//! Two calendar conventions meet here. Week boundaries are Sunday-based: a
//! tracking week starts at the most recent Sunday. The per-day completion
//! arrays are Monday-indexed: slot 0 is Monday and slot 6 is Sunday. Both are
//! kept behind [`current_week_start`] and [`day_index`].
//!
//! All operations take the current date explicitly and only mutate in memory.
//! Persisting the result is the caller's job (see `storage::Store::update_tracker`).

use crate::goals::{CalculatedGoals, calculate_user_goals};
use crate::models::{Preferences, Profile};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Index, IndexMut},
    str::FromStr,
};

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Calories,
    Protein,
    Water,
    Exercise,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Calories,
        Metric::Protein,
        Metric::Water,
        Metric::Exercise,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Calories => "calories",
            Metric::Protein => "protein",
            Metric::Water => "water",
            Metric::Exercise => "exercise",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric '{0}'")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == value)
            .ok_or_else(|| UnknownMetric(value.to_string()))
    }
}

/// One value per tracked metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct MetricMap<T> {
    pub calories: T,
    pub protein: T,
    pub water: T,
    pub exercise: T,
}

impl<T> MetricMap<T> {
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self {
            calories: f(Metric::Calories),
            protein: f(Metric::Protein),
            water: f(Metric::Water),
            exercise: f(Metric::Exercise),
        }
    }
}

impl<T> Index<Metric> for MetricMap<T> {
    type Output = T;

    fn index(&self, metric: Metric) -> &T {
        match metric {
            Metric::Calories => &self.calories,
            Metric::Protein => &self.protein,
            Metric::Water => &self.water,
            Metric::Exercise => &self.exercise,
        }
    }
}

impl<T> IndexMut<Metric> for MetricMap<T> {
    fn index_mut(&mut self, metric: Metric) -> &mut T {
        match metric {
            Metric::Calories => &mut self.calories,
            Metric::Protein => &mut self.protein,
            Metric::Water => &mut self.water,
            Metric::Exercise => &mut self.exercise,
        }
    }
}

/// Most recent Sunday at or before `today`.
pub fn current_week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
}

/// Slot of `date` in a completion array: Monday = 0 ... Sunday = 6.
pub fn day_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekTransition {
    Initialized,
    RolledOver,
    NewDay,
    Unchanged,
}

impl WeekTransition {
    pub fn changed(self) -> bool {
        self != WeekTransition::Unchanged
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyTracker {
    pub user_id: String,
    /// Bumped by the store on every successful save.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub week_start_date: Option<NaiveDate>,
    /// The day `todays_goals` refers to.
    #[serde(default)]
    pub goals_date: Option<NaiveDate>,
    #[serde(default)]
    pub weekly_progress: MetricMap<f64>,
    #[serde(default)]
    pub todays_goals: MetricMap<bool>,
    /// Amount each completed goal added today, so an undo removes exactly that.
    #[serde(default)]
    pub todays_contributions: MetricMap<Option<f64>>,
    #[serde(default)]
    pub weekly_completions: MetricMap<[bool; DAYS_PER_WEEK]>,
}

impl WeeklyTracker {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            revision: 0,
            week_start_date: None,
            goals_date: None,
            weekly_progress: MetricMap::default(),
            todays_goals: MetricMap::default(),
            todays_contributions: MetricMap::default(),
            weekly_completions: MetricMap::default(),
        }
    }

    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.week_start_date
            .is_some_and(|start| start < current_week_start(today))
    }

    /// Brings the tracker into the week containing `today`. Must run before
    /// any mutation so progress is never written into a week about to reset.
    pub fn initialize_or_roll_week(&mut self, today: NaiveDate) -> WeekTransition {
        let week_start = current_week_start(today);

        let transition = match self.week_start_date {
            None => {
                self.week_start_date = Some(week_start);
                WeekTransition::Initialized
            }
            Some(stored) if stored < week_start => {
                self.weekly_progress = MetricMap::default();
                self.todays_goals = MetricMap::default();
                self.todays_contributions = MetricMap::default();
                self.weekly_completions = MetricMap::default();
                self.week_start_date = Some(week_start);
                WeekTransition::RolledOver
            }
            Some(_) if self.goals_date != Some(today) => {
                self.todays_goals = MetricMap::default();
                self.todays_contributions = MetricMap::default();
                WeekTransition::NewDay
            }
            Some(_) => return WeekTransition::Unchanged,
        };

        self.goals_date = Some(today);
        transition
    }

    pub fn set_todays_goal(&mut self, metric: Metric, completed: bool, today: NaiveDate) {
        self.todays_goals[metric] = completed;
        self.weekly_completions[metric][day_index(today)] = completed;
        self.goals_date = Some(today);
    }

    /// Adds `contribution` as is; negative values undo earlier progress and
    /// the total is not clamped at zero.
    pub fn update_weekly_progress(&mut self, metric: Metric, contribution: f64, today: NaiveDate) {
        self.weekly_progress[metric] += contribution;
        self.weekly_completions[metric][day_index(today)] = true;
    }

    /// Completes or uncompletes today's goal for `metric`. Completing adds
    /// `contribution`; uncompleting removes whatever the completion added,
    /// falling back to `contribution` when nothing was recorded. Returns
    /// `false` when the goal was already in the requested state.
    pub fn apply_goal_completion(
        &mut self,
        metric: Metric,
        completed: bool,
        contribution: f64,
        today: NaiveDate,
    ) -> bool {
        if self.todays_goals[metric] == completed {
            return false;
        }

        if completed {
            self.set_todays_goal(metric, true, today);
            self.update_weekly_progress(metric, contribution, today);
            self.todays_contributions[metric] = Some(contribution);
        } else {
            let credited = self.todays_contributions[metric]
                .take()
                .unwrap_or(contribution);
            // Progress first: it marks today's slot, which the flag then clears.
            self.update_weekly_progress(metric, -credited, today);
            self.set_todays_goal(metric, false, today);
        }
        true
    }

    pub fn todays_goals(&self) -> MetricMap<bool> {
        self.todays_goals
    }

    pub fn completions(&self, metric: Metric) -> [bool; DAYS_PER_WEEK] {
        self.weekly_completions[metric]
    }

    /// Completion array for a metric named by string; unknown names read as
    /// an empty week.
    pub fn get_weekly_completions(&self, metric: &str) -> [bool; DAYS_PER_WEEK] {
        metric
            .parse::<Metric>()
            .map(|metric| self.completions(metric))
            .unwrap_or_default()
    }

    pub fn get_progress_percentage(
        &self,
        metric: Metric,
        profile: &Profile,
        preferences: &Preferences,
    ) -> u8 {
        let targets = get_weekly_targets(profile, preferences);
        percentage_of(self.weekly_progress[metric], targets[metric])
    }
}

/// Daily goals scaled to the week. Exercise is already weekly.
pub fn weekly_targets_from(goals: &CalculatedGoals) -> MetricMap<u32> {
    MetricMap {
        calories: goals.calories_kcal.saturating_mul(7),
        protein: goals.protein_g.saturating_mul(7),
        water: goals.water_glasses.saturating_mul(7),
        exercise: goals.exercise_minutes,
    }
}

pub fn get_weekly_targets(profile: &Profile, preferences: &Preferences) -> MetricMap<u32> {
    weekly_targets_from(&calculate_user_goals(profile, preferences))
}

/// What one completed day adds to each metric.
pub fn daily_contributions(goals: &CalculatedGoals) -> MetricMap<f64> {
    MetricMap {
        calories: f64::from(goals.calories_kcal),
        protein: f64::from(goals.protein_g),
        water: f64::from(goals.water_glasses),
        exercise: f64::from(goals.exercise_minutes) / DAYS_PER_WEEK as f64,
    }
}

/// Rounded share of `target`, clamped to 0..=100. A zero target reads as 0.
pub fn percentage_of(current: f64, target: u32) -> u8 {
    if target == 0 {
        return 0;
    }
    (current / f64::from(target) * 100.0).round().clamp(0.0, 100.0) as u8
}
