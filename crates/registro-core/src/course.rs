//! Course records, the nodes of the prerequisite graph.
//!
//! A course carries both directions of its prerequisite edges. `requires`
//! and `required_by` are populated by the catalog store on read; the engine
//! never edits them in place, it asks the store to write an edge and both
//! sets change together.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

const NAME_LEN: (usize, usize) = (3, 100);
const CODE_LEN: (usize, usize) = (3, 20);

// ─── Course ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub course_id:   Uuid,
  /// Unique human-readable code, e.g. `"CS101"`.
  pub code:        String,
  pub name:        String,
  pub credits:     u32,
  /// Courses that must be actively taken before enrolling in this one.
  pub requires:    BTreeSet<Uuid>,
  /// Courses that list this one in their `requires` set.
  pub required_by: BTreeSet<Uuid>,
}

impl Course {
  /// A course with no edges in either direction.
  pub fn new(
    course_id: Uuid,
    code: impl Into<String>,
    name: impl Into<String>,
    credits: u32,
  ) -> Self {
    Self {
      course_id,
      code: code.into(),
      name: name.into(),
      credits,
      requires: BTreeSet::new(),
      required_by: BTreeSet::new(),
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::registry::Registry::create_course`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
  pub code:          String,
  pub name:          String,
  pub credits:       u32,
  #[serde(default)]
  pub prerequisites: BTreeSet<Uuid>,
}

/// Input to [`crate::registry::Registry::update_course`].
///
/// Scalar fields are always replaced. `prerequisites: None` leaves the
/// current set untouched; `Some(empty)` clears it.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseUpdate {
  pub code:          String,
  pub name:          String,
  pub credits:       u32,
  pub prerequisites: Option<BTreeSet<Uuid>>,
}

/// Check the scalar fields shared by create and update.
pub fn validate_fields(code: &str, name: &str, credits: u32) -> Result<()> {
  check_len("name", name, NAME_LEN)?;
  check_len("code", code, CODE_LEN)?;
  if credits == 0 {
    return Err(Error::Validation("credits must be greater than 0".into()));
  }
  Ok(())
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<()> {
  let len = value.trim().chars().count();
  if len < min || len > max {
    return Err(Error::Validation(format!(
      "{field} must be between {min} and {max} characters (got {len})"
    )));
  }
  Ok(())
}
