//! Task ordering.
//!
//! One sort field at a time. Missing values sort last in both directions,
//! numbers compare numerically, everything else compares as text. The sort
//! is stable and has no secondary key: ties keep their input order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{sort_value, FieldValue};
use crate::model::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(Error::InvalidArgument(format!(
                "invalid sort direction '{other}' (expected asc|desc)"
            ))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Default ordering of task listings.
    pub fn by_priority() -> Self {
        Self::desc("priority_score")
    }

    /// Parse `field` or `field:asc` / `field:desc`.
    pub fn parse(input: &str) -> Result<Self> {
        let (field, direction) = match input.split_once(':') {
            Some((field, direction)) => (field, direction.parse()?),
            None => (input, SortDirection::Asc),
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(Error::InvalidArgument("sort field cannot be empty".to_string()));
        }
        Ok(Self::new(field, direction))
    }

    pub fn compare(&self, left: &Task, right: &Task) -> Ordering {
        compare_values(
            &sort_value(left, &self.field),
            &sort_value(right, &self.field),
            self.direction,
        )
    }
}

/// Header-click behaviour: a new field sorts ascending, the same field
/// goes ascending, then descending, then unsorted.
pub fn toggle(current: Option<&SortSpec>, field: &str) -> Option<SortSpec> {
    match current {
        Some(spec) if spec.field == field => match spec.direction {
            SortDirection::Asc => Some(SortSpec::desc(field)),
            SortDirection::Desc => None,
        },
        _ => Some(SortSpec::asc(field)),
    }
}

/// Compare two resolved values. Nulls go last regardless of direction.
pub fn compare_values(
    left: &FieldValue<'_>,
    right: &FieldValue<'_>,
    direction: SortDirection,
) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let ascending = match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => text_of(left).cmp(&text_of(right)),
    };

    match direction {
        SortDirection::Asc => ascending,
        SortDirection::Desc => ascending.reverse(),
    }
}

fn text_of(value: &FieldValue<'_>) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::Number(number) => number.to_string(),
        FieldValue::Text(text) | FieldValue::Opaque(text) => text.to_string(),
        FieldValue::Bool(flag) => flag.to_string(),
    }
}

/// Stable in-place sort.
pub fn sort_tasks<T>(tasks: &mut [T], spec: &SortSpec)
where
    T: AsRef<Task>,
{
    tasks.sort_by(|left, right| spec.compare(left.as_ref(), right.as_ref()));
}

impl AsRef<Task> for Task {
    fn as_ref(&self) -> &Task {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rating;
    use chrono::{NaiveDate, Utc};

    fn task(id: &str, leverage: i64, due: Option<(i32, u32, u32)>) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            project_id: None,
            client_id: None,
            domain_id: None,
            leverage: Rating::new(leverage).expect("rating"),
            urgency: Rating::new(1).expect("rating"),
            effort: Rating::new(1).expect("rating"),
            status: Default::default(),
            due_date: due.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            template_task_id: None,
            created_at: Utc::now(),
            completed_at: None,
            custom_fields: Default::default(),
            domain: None,
            client: None,
            project: None,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let mut tasks = vec![task("none", 1, None), task("dated", 1, Some((2024, 1, 1)))];
        sort_tasks(&mut tasks, &SortSpec::asc("due_date"));
        assert_eq!(ids(&tasks), vec!["dated", "none"]);

        let mut tasks = vec![task("none", 1, None), task("dated", 1, Some((2024, 1, 1)))];
        sort_tasks(&mut tasks, &SortSpec::desc("due_date"));
        assert_eq!(ids(&tasks), vec!["dated", "none"]);
    }

    #[test]
    fn numbers_compare_numerically() {
        let mut tasks = vec![task("a", 2, None), task("b", 5, None), task("c", 1, None)];
        sort_tasks(&mut tasks, &SortSpec::desc("leverage"));
        assert_eq!(ids(&tasks), vec!["b", "a", "c"]);
    }

    #[test]
    fn text_compares_case_sensitively() {
        let mut tasks = vec![task("beta", 1, None), task("Zed", 1, None), task("alpha", 1, None)];
        sort_tasks(&mut tasks, &SortSpec::asc("title"));
        assert_eq!(ids(&tasks), vec!["Zed", "alpha", "beta"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let mut tasks = vec![
            task("first", 3, None),
            task("second", 3, None),
            task("top", 5, None),
            task("third", 3, None),
        ];
        sort_tasks(&mut tasks, &SortSpec::by_priority());
        assert_eq!(ids(&tasks), vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn toggle_cycles_asc_desc_none() {
        let first = toggle(None, "title");
        assert_eq!(first, Some(SortSpec::asc("title")));
        let second = toggle(first.as_ref(), "title");
        assert_eq!(second, Some(SortSpec::desc("title")));
        assert_eq!(toggle(second.as_ref(), "title"), None);
        assert_eq!(
            toggle(Some(&SortSpec::desc("title")), "effort"),
            Some(SortSpec::asc("effort"))
        );
    }

    #[test]
    fn parse_accepts_optional_direction() {
        assert_eq!(SortSpec::parse("due_date").expect("parse"), SortSpec::asc("due_date"));
        assert_eq!(
            SortSpec::parse("priority_score:desc").expect("parse"),
            SortSpec::by_priority()
        );
        assert!(SortSpec::parse(":asc").is_err());
        assert!(SortSpec::parse("title:sideways").is_err());
    }
}
