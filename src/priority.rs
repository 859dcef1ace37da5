//! Priority scoring and leverage/effort quadrants.
//!
//! The score is `(leverage * 2 + urgency) / effort`. Higher means more
//! important; it is the default ordering of every task listing.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Rating, Task};

/// Score for validated ratings. Effort is at least 1, so this cannot divide by zero.
pub fn score(leverage: Rating, urgency: Rating, effort: Rating) -> f64 {
    raw_score(leverage.get(), urgency.get(), effort.get())
}

/// Score for unvalidated inputs. Out-of-range ratings are a validation error.
pub fn try_score(leverage: i64, urgency: i64, effort: i64) -> Result<f64> {
    if effort == 0 {
        return Err(Error::Validation("effort cannot be zero".to_string()));
    }
    let leverage = Rating::new(leverage)?;
    let urgency = Rating::new(urgency)?;
    let effort = Rating::new(effort)?;
    Ok(score(leverage, urgency, effort))
}

fn raw_score(leverage: u8, urgency: u8, effort: u8) -> f64 {
    (f64::from(leverage) * 2.0 + f64::from(urgency)) / f64::from(effort)
}

/// Display form of a score, one decimal place.
pub fn format_score(score: f64) -> String {
    format!("{score:.1}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// High leverage, low effort.
    QuickWin,
    /// High leverage, high effort.
    BigProject,
    /// Low leverage, low effort.
    FillIn,
    /// Low leverage, high effort.
    Avoid,
}

impl Quadrant {
    pub fn label(self) -> &'static str {
        match self {
            Quadrant::QuickWin => "Quick Wins (DO NOW)",
            Quadrant::BigProject => "Big Projects (SCHEDULE)",
            Quadrant::FillIn => "Fill-ins (DELEGATE)",
            Quadrant::Avoid => "Avoid (ELIMINATE)",
        }
    }
}

/// Axis midlines for quadrant bucketing. A rating at or above the
/// threshold counts as high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadrantThresholds {
    pub leverage: Rating,
    pub effort: Rating,
}

impl Default for QuadrantThresholds {
    fn default() -> Self {
        Self {
            leverage: Rating::DEFAULT,
            effort: Rating::DEFAULT,
        }
    }
}

pub fn classify(leverage: Rating, effort: Rating, thresholds: QuadrantThresholds) -> Quadrant {
    let high_leverage = leverage >= thresholds.leverage;
    let high_effort = effort >= thresholds.effort;
    match (high_leverage, high_effort) {
        (true, false) => Quadrant::QuickWin,
        (true, true) => Quadrant::BigProject,
        (false, false) => Quadrant::FillIn,
        (false, true) => Quadrant::Avoid,
    }
}

/// One task placed on the leverage/effort matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixPoint {
    pub id: String,
    pub title: String,
    pub leverage: u8,
    pub urgency: u8,
    pub effort: u8,
    pub priority_score: f64,
    pub domain_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_color: Option<String>,
    pub quadrant: Quadrant,
}

const UNASSIGNED_DOMAIN: &str = "Unassigned";

/// Place open work (todo and in progress) on the matrix, optionally narrowed
/// to one domain. Input order is kept.
pub fn matrix_points<'a, I>(
    tasks: I,
    domain_id: Option<&str>,
    thresholds: QuadrantThresholds,
) -> Vec<MatrixPoint>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|task| task.status.is_active())
        .filter(|task| match domain_id {
            Some(domain_id) => task.domain_id.as_deref() == Some(domain_id),
            None => true,
        })
        .map(|task| MatrixPoint {
            id: task.id.clone(),
            title: task.title.clone(),
            leverage: task.leverage.get(),
            urgency: task.urgency.get(),
            effort: task.effort.get(),
            priority_score: task.priority_score(),
            domain_name: task
                .domain
                .as_ref()
                .map(|domain| domain.name.clone())
                .unwrap_or_else(|| UNASSIGNED_DOMAIN.to_string()),
            domain_color: task.domain.as_ref().and_then(|domain| domain.color.clone()),
            quadrant: classify(task.leverage, task.effort, thresholds),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(value: i64) -> Rating {
        Rating::new(value).expect("rating")
    }

    #[test]
    fn score_matches_formula_for_all_inputs() {
        for l in 1..=5i64 {
            for u in 1..=5i64 {
                for e in 1..=5i64 {
                    let expected = (l as f64 * 2.0 + u as f64) / e as f64;
                    assert_eq!(score(rating(l), rating(u), rating(e)), expected);
                }
            }
        }
    }

    #[test]
    fn score_extremes() {
        assert_eq!(score(rating(5), rating(5), rating(1)), 15.0);
        assert_eq!(score(rating(1), rating(1), rating(5)), 0.6);
    }

    #[test]
    fn try_score_rejects_zero_effort() {
        let err = try_score(3, 3, 0).expect_err("zero effort");
        assert!(matches!(err, Error::Validation(_)));
        assert!(try_score(6, 1, 1).is_err());
        assert_eq!(try_score(2, 1, 1).expect("score"), 5.0);
    }

    #[test]
    fn classify_uses_inclusive_thresholds() {
        let t = QuadrantThresholds::default();
        assert_eq!(classify(rating(5), rating(1), t), Quadrant::QuickWin);
        assert_eq!(classify(rating(3), rating(3), t), Quadrant::BigProject);
        assert_eq!(classify(rating(2), rating(2), t), Quadrant::FillIn);
        assert_eq!(classify(rating(1), rating(5), t), Quadrant::Avoid);
    }

    #[test]
    fn format_score_rounds_to_one_decimal() {
        assert_eq!(format_score(0.6), "0.6");
        assert_eq!(format_score(13.0 / 3.0), "4.3");
    }
}
