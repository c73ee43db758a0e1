//! Multi-factor ranking engine.
//!
//! Each task is scored against a [`QueryContext`] with four independently
//! bounded terms, then combined linearly:
//!
//! | Term               | Weight | Range         |
//! |--------------------|--------|---------------|
//! | urgency            | 0.50   | 0.0 ..= 1.5   |
//! | fit                | 0.25   | 0.0 ..= 1.0   |
//! | emotional affinity | 0.15   | -0.10 ..= 0.30|
//! | stress match       | 0.10   | 0.0 ..= 1.0   |
//!
//! Listing order is score descending, then earliest parseable deadline, then
//! fewest minutes, then id. Picking the single best task uses the same order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::context::QueryContext;
use crate::task::{Deadline, Emotion, Task};

/// Inclusive bounds of each sub-score, as `(min, max)`.
pub const URGENCY_RANGE: (f64, f64) = (0.0, 1.5);
pub const FIT_RANGE: (f64, f64) = (0.0, 1.0);
pub const EMOTION_RANGE: (f64, f64) = (-0.10, 0.30);
pub const STRESS_MATCH_RANGE: (f64, f64) = (0.0, 1.0);

/// Ceiling of the no-deadline urgency branch.
const NO_DEADLINE_URGENCY_CAP: f64 = 0.8;

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.clamp(lo, hi)
}

/// Deadline proximity and importance.
///
/// Without a usable deadline this is `0.15 × importance` capped at 0.8. With
/// one, an inverse-log time-pressure term (1.0 when due now, shrinking slowly
/// with distance) plus `0.2 × (importance − 1)`, capped at 1.5. Overdue tasks
/// count as due now.
pub fn urgency_score(task: &Task, now: DateTime<Utc>) -> f64 {
    let importance = task.importance as f64;
    match task.deadline() {
        Deadline::At(due) => {
            let minutes_left = ((due - now).num_milliseconds() as f64 / 60_000.0).max(0.0);
            let time_pressure = 1.0 / (10.0 + minutes_left).log10();
            let importance_boost = 0.2 * (importance - 1.0);
            clamp(time_pressure + importance_boost, URGENCY_RANGE.0, URGENCY_RANGE.1)
        }
        Deadline::None | Deadline::Malformed(_) => {
            clamp(0.15 * importance, URGENCY_RANGE.0, NO_DEADLINE_URGENCY_CAP)
        }
    }
}

/// How well the task matches the free-time budget.
///
/// Tasks that fit score at least 0.6, more for shorter ones. Tasks that do not
/// fit earn `0.3 ×` the fraction that could be done now.
pub fn fit_score(task: &Task, free_minutes: i64) -> f64 {
    if free_minutes <= 0 {
        return 0.0;
    }
    let needed = task.minutes_needed.max(0);
    if needed <= free_minutes {
        let quickness = 1.0 / (1.0 + (1.0 + needed as f64).log10());
        clamp(0.6 + 0.4 * quickness, FIT_RANGE.0, FIT_RANGE.1)
    } else {
        let ratio = free_minutes as f64 / needed as f64;
        clamp(0.3 * ratio, FIT_RANGE.0, FIT_RANGE.1)
    }
}

/// Small bonus or penalty for how the task feels under the current stress.
pub fn emotion_score(task: &Task, ctx: &QueryContext) -> f64 {
    let stressed = ctx.is_stressed();
    match task.emotion {
        Emotion::Pleasant if stressed => 0.30,
        Emotion::Pleasant => 0.15,
        Emotion::Neutral => 0.10,
        Emotion::Aversive if stressed => -0.10,
        Emotion::Aversive => 0.05,
        Emotion::Unknown(_) => 0.0,
    }
}

/// Short tasks under stress, substantial ones when calm, flat in between.
pub fn stress_match_score(task: &Task, ctx: &QueryContext) -> f64 {
    let minutes = task.minutes_needed.max(0) as f64;
    if ctx.is_stressed() {
        clamp(
            1.0 / (1.0 + (5.0 + minutes).log10()),
            STRESS_MATCH_RANGE.0,
            STRESS_MATCH_RANGE.1,
        )
    } else if ctx.is_calm() {
        clamp(
            (10.0 + minutes).log10() / 3.0,
            STRESS_MATCH_RANGE.0,
            STRESS_MATCH_RANGE.1,
        )
    } else {
        0.5
    }
}

/// Weights for each term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub urgency: f64,
    pub fit: f64,
    pub emotion: f64,
    pub stress_match: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            urgency: 0.50,
            fit: 0.25,
            emotion: 0.15,
            stress_match: 0.10,
        }
    }
}

impl RankingWeights {
    /// Lowest and highest combined score these weights can produce.
    pub fn envelope(&self) -> (f64, f64) {
        let terms = [
            (self.urgency, URGENCY_RANGE),
            (self.fit, FIT_RANGE),
            (self.emotion, EMOTION_RANGE),
            (self.stress_match, STRESS_MATCH_RANGE),
        ];
        terms.iter().fold((0.0, 0.0), |(lo, hi), (w, (min, max))| {
            (lo + (w * min).min(w * max), hi + (w * min).max(w * max))
        })
    }
}

/// Individual term of a score with its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTerm {
    /// Term name
    pub name: String,
    pub weight: f64,
    /// Raw sub-score, already clamped to the term's range
    pub score: f64,
    /// `weight × score`
    pub contribution: f64,
}

impl ObjectiveTerm {
    pub fn new(name: impl Into<String>, weight: f64, score: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            score,
            contribution: weight * score,
        }
    }
}

/// Term-by-term explanation of one task's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub task_id: String,
    pub terms: Vec<ObjectiveTerm>,
    /// Sum of the contributions; identical to [`RankingEngine::score`]
    pub total_score: f64,
    /// The context's evaluation instant
    pub scored_at: DateTime<Utc>,
}

impl ScoreBreakdown {
    fn new(task_id: &str, scored_at: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.to_string(),
            terms: Vec::with_capacity(4),
            total_score: 0.0,
            scored_at,
        }
    }

    fn add_term(&mut self, term: ObjectiveTerm) {
        self.total_score += term.contribution;
        self.terms.push(term);
    }

    /// The term that contributed most.
    pub fn top_term(&self) -> Option<&ObjectiveTerm> {
        self.terms
            .iter()
            .max_by(|a, b| a.contribution.total_cmp(&b.contribution))
    }
}

/// A task paired with its score under one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTask {
    #[serde(flatten)]
    pub task: Task,
    pub score: f64,
    /// Parsed deadline for tie-breaking; `None` when absent or malformed
    #[serde(skip)]
    pub deadline: Option<DateTime<Utc>>,
}

impl RankedTask {
    pub fn new(task: Task, score: f64) -> Self {
        let deadline = task.deadline().instant();
        Self {
            task,
            score,
            deadline,
        }
    }
}

/// Listing order: higher score first, then earlier deadline (tasks without a
/// usable one go last), then fewer minutes, then id.
pub fn compare_ranked(a: &RankedTask, b: &RankedTask) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(da), Some(db)) => da.cmp(&db),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.task.minutes_needed.cmp(&b.task.minutes_needed))
        .then_with(|| a.task.id.cmp(&b.task.id))
}

/// Scores and orders tasks. Pure: holds no task state.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    weights: RankingWeights,
}

impl RankingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: RankingWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    /// Explain a task's score term by term.
    pub fn breakdown(&self, task: &Task, ctx: &QueryContext) -> ScoreBreakdown {
        let w = &self.weights;
        let mut breakdown = ScoreBreakdown::new(&task.id, ctx.now);
        breakdown.add_term(ObjectiveTerm::new("urgency", w.urgency, urgency_score(task, ctx.now)));
        breakdown.add_term(ObjectiveTerm::new("fit", w.fit, fit_score(task, ctx.free_minutes)));
        breakdown.add_term(ObjectiveTerm::new(
            "emotion",
            w.emotion,
            emotion_score(task, ctx),
        ));
        breakdown.add_term(ObjectiveTerm::new(
            "stress_match",
            w.stress_match,
            stress_match_score(task, ctx),
        ));
        breakdown
    }

    /// Combined score.
    pub fn score(&self, task: &Task, ctx: &QueryContext) -> f64 {
        self.breakdown(task, ctx).total_score
    }

    /// Score every task and sort into listing order.
    pub fn rank(&self, tasks: Vec<Task>, ctx: &QueryContext) -> Vec<RankedTask> {
        let mut ranked: Vec<RankedTask> = tasks
            .into_iter()
            .map(|task| {
                let score = self.score(&task, ctx);
                RankedTask::new(task, score)
            })
            .collect();
        ranked.sort_by(compare_ranked);
        ranked
    }

    /// Tasks in listing order, without scores.
    pub fn order(&self, tasks: Vec<Task>, ctx: &QueryContext) -> Vec<Task> {
        self.rank(tasks, ctx).into_iter().map(|r| r.task).collect()
    }

    /// The task that would head the listing, or `None` for an empty set.
    pub fn best(&self, tasks: Vec<Task>, ctx: &QueryContext) -> Option<RankedTask> {
        tasks
            .into_iter()
            .map(|task| {
                let score = self.score(&task, ctx);
                RankedTask::new(task, score)
            })
            .min_by(compare_ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    fn ctx(free: i64, stress: i64) -> QueryContext {
        QueryContext::new(fixed_now(), Some(free), Some(stress))
    }

    const EPS: f64 = 1e-9;

    #[test]
    fn urgency_without_deadline_scales_with_importance() {
        let now = fixed_now();
        let low = Task::new("a", "x").with_importance(1);
        let mid = Task::new("b", "x").with_importance(3);
        let high = Task::new("c", "x").with_importance(10);
        assert!((urgency_score(&low, now) - 0.15).abs() < EPS);
        assert!((urgency_score(&mid, now) - 0.45).abs() < EPS);
        assert!((urgency_score(&high, now) - 0.8).abs() < EPS);
        assert_eq!(urgency_score(&Task::new("d", "x").with_importance(-2), now), 0.0);
    }

    #[test]
    fn urgency_due_now_is_time_pressure_plus_boost() {
        let now = fixed_now();
        let task = Task::new("a", "x").with_importance(2).with_due(now);
        // 1/log10(10) = 1.0, boost 0.2
        assert!((urgency_score(&task, now) - 1.2).abs() < EPS);
    }

    #[test]
    fn overdue_task_clamps_to_due_now() {
        let now = fixed_now();
        let overdue = Task::new("a", "x")
            .with_importance(1)
            .with_due(now - Duration::days(3));
        let due_now = Task::new("b", "x").with_importance(1).with_due(now);
        assert_eq!(urgency_score(&overdue, now), urgency_score(&due_now, now));
        assert!((urgency_score(&overdue, now) - 1.0).abs() < EPS);
    }

    #[test]
    fn urgency_grows_as_deadline_approaches() {
        let now = fixed_now();
        let soon = Task::new("a", "x").with_importance(1).with_due(now + Duration::minutes(5));
        let later = Task::new("b", "x").with_importance(1).with_due(now + Duration::days(7));
        assert!(urgency_score(&soon, now) > urgency_score(&later, now));
    }

    #[test]
    fn urgency_caps_at_one_and_a_half() {
        let now = fixed_now();
        let task = Task::new("a", "x").with_importance(5).with_due(now);
        assert_eq!(urgency_score(&task, now), 1.5);
    }

    #[test]
    fn malformed_deadline_falls_back_to_importance_branch() {
        let now = fixed_now();
        let malformed = Task::new("a", "x").with_importance(4).with_due_raw("tomorrow-ish");
        let none = Task::new("b", "x").with_importance(4);
        assert_eq!(urgency_score(&malformed, now), urgency_score(&none, now));
    }

    #[test]
    fn fit_is_zero_without_free_time() {
        let task = Task::new("a", "x").with_minutes(5);
        assert_eq!(fit_score(&task, 0), 0.0);
        assert_eq!(fit_score(&task, -30), 0.0);
    }

    #[test]
    fn fit_prefers_short_tasks_that_fit() {
        let short = Task::new("a", "x").with_minutes(5);
        let long = Task::new("b", "x").with_minutes(30);
        let s = fit_score(&short, 30);
        let l = fit_score(&long, 30);
        assert!(s > l);
        assert!(l >= 0.6);
        assert_eq!(fit_score(&Task::new("c", "x").with_minutes(0), 30), 1.0);
    }

    #[test]
    fn fit_rewards_partial_progress_when_too_long() {
        let task = Task::new("a", "x").with_minutes(120);
        assert!((fit_score(&task, 30) - 0.075).abs() < EPS);
    }

    #[test]
    fn negative_minutes_are_treated_as_zero() {
        let task = Task::new("a", "x").with_minutes(-40);
        let zero = Task::new("b", "x").with_minutes(0);
        assert_eq!(fit_score(&task, 30), fit_score(&zero, 30));
        for c in [ctx(30, 5), ctx(30, 1)] {
            assert_eq!(stress_match_score(&task, &c), stress_match_score(&zero, &c));
        }
    }

    #[test]
    fn emotion_depends_on_stress() {
        let pleasant = Task::new("a", "x").with_emotion(Emotion::Pleasant);
        let aversive = Task::new("b", "x").with_emotion(Emotion::Aversive);
        let neutral = Task::new("c", "x").with_emotion(Emotion::Neutral);
        let unknown = Task::new("d", "x").with_emotion(Emotion::Unknown("MEH".into()));

        assert_eq!(emotion_score(&pleasant, &ctx(30, 5)), 0.30);
        assert_eq!(emotion_score(&pleasant, &ctx(30, 2)), 0.15);
        assert_eq!(emotion_score(&aversive, &ctx(30, 4)), -0.10);
        assert_eq!(emotion_score(&aversive, &ctx(30, 3)), 0.05);
        assert_eq!(emotion_score(&neutral, &ctx(30, 5)), 0.10);
        assert_eq!(emotion_score(&unknown, &ctx(30, 5)), 0.0);
    }

    #[test]
    fn stress_match_bands() {
        let short = Task::new("a", "x").with_minutes(5);
        let long = Task::new("b", "x").with_minutes(240);
        let (stressed, calm, middle) = (ctx(30, 5), ctx(30, 1), ctx(30, 3));
        assert!(stress_match_score(&short, &stressed) > stress_match_score(&long, &stressed));
        assert!(stress_match_score(&long, &calm) > stress_match_score(&short, &calm));
        assert_eq!(stress_match_score(&short, &middle), 0.5);
        assert_eq!(stress_match_score(&long, &middle), 0.5);
    }

    #[test]
    fn score_bands_follow_context_stress_bands() {
        let pleasant = Task::new("a", "x").with_emotion(Emotion::Pleasant).with_minutes(20);
        for level in -2..=8 {
            let c = ctx(30, level);
            assert_eq!(emotion_score(&pleasant, &c) == 0.30, c.is_stressed(), "level {level}");
            let flat = stress_match_score(&pleasant, &c) == 0.5;
            assert_eq!(flat, !c.is_stressed() && !c.is_calm(), "level {level}");
        }
    }

    #[test]
    fn default_envelope_matches_term_bounds() {
        let (lo, hi) = RankingWeights::default().envelope();
        assert!((lo - -0.015).abs() < EPS);
        assert!((hi - 1.145).abs() < EPS);
    }

    #[test]
    fn breakdown_total_equals_score() {
        let engine = RankingEngine::new();
        let task = Task::new("a", "x")
            .with_emotion(Emotion::Pleasant)
            .with_minutes(10)
            .with_importance(5)
            .with_due(fixed_now() + Duration::minutes(5));
        let c = ctx(30, 5);
        let breakdown = engine.breakdown(&task, &c);
        assert_eq!(breakdown.terms.len(), 4);
        assert_eq!(breakdown.total_score, engine.score(&task, &c));
        assert_eq!(breakdown.top_term().map(|t| t.name.as_str()), Some("urgency"));
    }

    #[test]
    fn pleasant_urgent_short_task_beats_aversive_long_one_under_stress() {
        let engine = RankingEngine::new();
        let a = Task::new("A", "quick and due")
            .with_emotion(Emotion::Pleasant)
            .with_minutes(10)
            .with_importance(5)
            .with_due(fixed_now() + Duration::minutes(5));
        let b = Task::new("B", "long slog")
            .with_emotion(Emotion::Aversive)
            .with_minutes(120)
            .with_importance(1);
        let c = ctx(30, 5);

        assert!(urgency_score(&a, c.now) > urgency_score(&b, c.now));
        assert!(fit_score(&a, c.free_minutes) > fit_score(&b, c.free_minutes));
        assert!(emotion_score(&a, &c) > emotion_score(&b, &c));

        let order = engine.order(vec![b.clone(), a.clone()], &c);
        assert_eq!(order[0].id, "A");
        assert_eq!(engine.best(vec![b, a], &c).map(|r| r.task.id), Some("A".into()));
    }

    #[test]
    fn equal_scores_prefer_the_task_with_a_deadline() {
        let due = Task::new("due", "x").with_due(fixed_now() + Duration::hours(1));
        let open = Task::new("open", "x");
        let a = RankedTask::new(open, 0.5);
        let b = RankedTask::new(due, 0.5);
        assert_eq!(compare_ranked(&b, &a), Ordering::Less);

        let mut list = vec![a, b];
        list.sort_by(compare_ranked);
        assert_eq!(list[0].task.id, "due");
    }

    #[test]
    fn equal_scores_without_deadlines_prefer_shorter_tasks() {
        let short = RankedTask::new(Task::new("z", "x").with_minutes(10), 0.4);
        let long = RankedTask::new(Task::new("a", "x").with_minutes(60), 0.4);
        assert_eq!(compare_ranked(&short, &long), Ordering::Less);
    }

    #[test]
    fn malformed_deadline_sorts_like_no_deadline() {
        let malformed = RankedTask::new(Task::new("m", "x").with_due_raw("soon"), 0.4);
        let dated = RankedTask::new(
            Task::new("d", "x").with_due(fixed_now() + Duration::days(30)),
            0.4,
        );
        assert_eq!(compare_ranked(&dated, &malformed), Ordering::Less);
        assert_eq!(malformed.deadline, None);
    }

    #[test]
    fn best_of_nothing_is_none() {
        assert!(RankingEngine::new().best(Vec::new(), &ctx(30, 3)).is_none());
    }

    #[test]
    fn best_breaks_ties_like_listing() {
        let engine = RankingEngine::new();
        let c = ctx(30, 3);
        // identical except id: same score, same deadline, same minutes
        let tasks: Vec<Task> = ["c", "a", "b"]
            .iter()
            .map(|id| Task::new(*id, "same"))
            .collect();
        let first = engine.order(tasks.clone(), &c)[0].id.clone();
        assert_eq!(first, "a");
        assert_eq!(engine.best(tasks, &c).map(|r| r.task.id), Some(first));
    }

    fn arb_emotion() -> impl Strategy<Value = Emotion> {
        prop_oneof![
            Just(Emotion::Pleasant),
            Just(Emotion::Neutral),
            Just(Emotion::Aversive),
            "[A-Z]{0,6}".prop_map(|s| Emotion::from_tag(&s)),
        ]
    }

    prop_compose! {
        fn arb_task()(
            id in "[a-z0-9]{1,8}",
            emotion in arb_emotion(),
            minutes in -60i64..10_000,
            importance in -10i64..20,
            due_offset in proptest::option::of(-100_000i64..1_000_000),
        ) -> Task {
            let mut task = Task::new(id, "t")
                .with_emotion(emotion)
                .with_minutes(minutes)
                .with_importance(importance);
            if let Some(offset) = due_offset {
                task = task.with_due(fixed_now() + Duration::minutes(offset));
            }
            task
        }
    }

    proptest! {
        #[test]
        fn combined_score_stays_within_envelope(
            task in arb_task(),
            free in -100i64..1_000,
            stress in -5i64..10,
        ) {
            let engine = RankingEngine::new();
            let (lo, hi) = engine.weights().envelope();
            let score = engine.score(&task, &ctx(free, stress));
            prop_assert!(score.is_finite());
            prop_assert!(score >= lo - EPS && score <= hi + EPS, "score {} outside [{}, {}]", score, lo, hi);
        }

        #[test]
        fn urgency_without_deadline_is_bounded_and_monotonic(importance in -50i64..50) {
            let now = fixed_now();
            let a = urgency_score(&Task::new("a", "x").with_importance(importance), now);
            let b = urgency_score(&Task::new("b", "x").with_importance(importance + 1), now);
            prop_assert!((0.0..=0.8).contains(&a));
            prop_assert!(b >= a);
        }

        #[test]
        fn fit_is_zero_whenever_no_time_is_free(minutes in -100i64..10_000, free in -1_000i64..=0) {
            prop_assert_eq!(fit_score(&Task::new("a", "x").with_minutes(minutes), free), 0.0);
        }

        #[test]
        fn ranking_is_deterministic(
            tasks in proptest::collection::vec(arb_task(), 0..20),
            free in 1i64..240,
            stress in 1i64..6,
        ) {
            let engine = RankingEngine::new();
            let c = ctx(free, stress);
            // ids are unique in a store
            let tasks: Vec<Task> = tasks
                .into_iter()
                .enumerate()
                .map(|(i, mut t)| {
                    t.id = format!("t{i}");
                    t
                })
                .collect();
            let mut reversed = tasks.clone();
            reversed.reverse();
            let forward: Vec<Task> = engine.order(tasks, &c);
            let backward: Vec<Task> = engine.order(reversed, &c);
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn listing_is_sorted_under_the_comparator(
            tasks in proptest::collection::vec(arb_task(), 0..20),
        ) {
            let ranked = RankingEngine::new().rank(tasks, &ctx(30, 3));
            for pair in ranked.windows(2) {
                prop_assert_ne!(compare_ranked(&pair[0], &pair[1]), Ordering::Greater);
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
