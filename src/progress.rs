use crate::goals::CalculatedGoals;
use crate::models::{MetricProgress, ProgressResponse, UserGoalsSummary};
use crate::tracker::{
    Metric, MetricMap, WeeklyTracker, daily_contributions, day_index, percentage_of,
    weekly_targets_from,
};
use chrono::NaiveDate;

pub fn build_progress_at(
    today: NaiveDate,
    tracker: &WeeklyTracker,
    goals: &CalculatedGoals,
) -> ProgressResponse {
    let targets = weekly_targets_from(goals);

    ProgressResponse {
        week_start_date: tracker.week_start_date.map(|date| date.to_string()),
        today_index: day_index(today),
        today_goals: tracker.todays_goals(),
        weekly_progress: MetricMap::from_fn(|metric| {
            metric_progress(tracker, metric, targets[metric])
        }),
        today_contributions: daily_contributions(goals),
        user_goals: UserGoalsSummary {
            daily_calories: goals.calories_kcal,
            daily_protein: goals.protein_g,
            daily_water: goals.water_glasses,
            weekly_exercise: goals.exercise_minutes,
            calculated: goals.is_calculated,
        },
    }
}

fn metric_progress(tracker: &WeeklyTracker, metric: Metric, target: u32) -> MetricProgress {
    let current = tracker.weekly_progress[metric];
    MetricProgress {
        current,
        target,
        percentage: percentage_of(current, target),
        daily_completions: tracker.completions(metric),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::calculate_user_goals;
    use crate::models::{Preferences, Profile};

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 7).unwrap()
    }

    #[test]
    fn progress_reports_every_metric() {
        let goals = calculate_user_goals(&Profile::default(), &Preferences::default());
        let mut tracker = WeeklyTracker::new("u1");
        tracker.initialize_or_roll_week(wednesday());
        tracker.apply_goal_completion(Metric::Calories, true, 2000.0, wednesday());

        let progress = build_progress_at(wednesday(), &tracker, &goals);
        assert_eq!(progress.week_start_date.as_deref(), Some("2026-01-04"));
        assert_eq!(progress.today_index, 2);
        assert!(progress.today_goals.calories);
        assert!(!progress.today_goals.water);

        let calories = &progress.weekly_progress.calories;
        assert_eq!(calories.current, 2000.0);
        assert_eq!(calories.target, 14000);
        assert_eq!(calories.percentage, 14);
        assert_eq!(calories.daily_completions, [false, false, true, false, false, false, false]);

        assert_eq!(progress.weekly_progress.water.target, 56);
        assert_eq!(progress.weekly_progress.exercise.target, 210);
        assert_eq!(progress.today_contributions.exercise, 30.0);
        assert!(!progress.user_goals.calculated);
    }

    #[test]
    fn fresh_tracker_has_seven_empty_days() {
        let goals = calculate_user_goals(&Profile::default(), &Preferences::default());
        let tracker = WeeklyTracker::new("u1");
        let progress = build_progress_at(wednesday(), &tracker, &goals);

        assert!(progress.week_start_date.is_none());
        for metric in [
            &progress.weekly_progress.calories,
            &progress.weekly_progress.protein,
            &progress.weekly_progress.water,
            &progress.weekly_progress.exercise,
        ] {
            assert_eq!(metric.daily_completions, [false; 7]);
            assert_eq!(metric.percentage, 0);
        }
    }
}
