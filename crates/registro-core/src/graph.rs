//! The prerequisite graph engine.
//!
//! [`PrerequisiteGraph`] is an arena of course nodes indexed by id; edges
//! are index lists in both directions. It is rebuilt from the catalog at the
//! start of every edit, checked, and the accepted edits are then written
//! back through [`CatalogStore`] in the caller's transaction.
//!
//! Every operation below validates the whole request before its first
//! write, so a rejected edit never leaves a partial change behind even on a
//! store without rollback.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::CatalogStore,
  course::{Course, CourseUpdate, NewCourse, validate_fields},
  error::{Conflict, Entity, GraphViolation},
};

// ─── Arena ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Node {
  course_id:   Uuid,
  requires:    Vec<usize>,
  required_by: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct PrerequisiteGraph {
  index: HashMap<Uuid, usize>,
  nodes: Vec<Node>,
}

impl PrerequisiteGraph {
  pub fn new() -> Self { Self::default() }

  /// Build a graph from stored edges without validating them. Traversals
  /// stay finite even if the stored edges are already cyclic.
  pub fn from_edges(edges: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
    let mut graph = Self::new();
    for (course, prerequisite) in edges {
      graph.link(course, prerequisite);
    }
    graph
  }

  /// Snapshot the catalog's edges.
  pub fn load(store: &impl CatalogStore) -> Result<Self> {
    let graph = Self::from_edges(store.prerequisite_edges()?);
    if graph.has_cycle() {
      warn!("stored prerequisite graph already contains a cycle");
    }
    Ok(graph)
  }

  pub fn contains(&self, id: Uuid) -> bool { self.index.contains_key(&id) }

  pub fn requires(&self, id: Uuid) -> BTreeSet<Uuid> {
    self.neighbours(id, |n| &n.requires)
  }

  pub fn required_by(&self, id: Uuid) -> BTreeSet<Uuid> {
    self.neighbours(id, |n| &n.required_by)
  }

  /// Whether `to` can be reached from `from` by following `requires` edges.
  /// Each node is expanded at most once.
  pub fn reaches(&self, from: Uuid, to: Uuid) -> bool {
    let (Some(&start), Some(&goal)) = (self.index.get(&from), self.index.get(&to))
    else {
      return false;
    };

    let mut visited = vec![false; self.nodes.len()];
    let mut stack = vec![start];
    while let Some(ix) = stack.pop() {
      if ix == goal {
        return true;
      }
      if std::mem::replace(&mut visited[ix], true) {
        continue;
      }
      stack.extend(
        self.nodes[ix].requires.iter().copied().filter(|n| !visited[*n]),
      );
    }
    false
  }

  /// Decide whether `course requires prerequisite` may be added.
  ///
  /// The check runs from the prerequisite's side: if `course` is already
  /// reachable from `prerequisite`, the new edge would close a cycle.
  pub fn check_edge(
    &self,
    course: Uuid,
    prerequisite: Uuid,
  ) -> Result<(), GraphViolation> {
    if course == prerequisite {
      return Err(GraphViolation::SelfLoop(course));
    }
    if self.reaches(prerequisite, course) {
      debug!(%course, %prerequisite, "prerequisite reaches course");
      return Err(GraphViolation::Cycle { course, prerequisite });
    }
    Ok(())
  }

  /// Check and then record an edge in both directions.
  #[cfg(test)]
  fn add_edge(
    &mut self,
    course: Uuid,
    prerequisite: Uuid,
  ) -> Result<(), GraphViolation> {
    self.check_edge(course, prerequisite)?;
    self.link(course, prerequisite);
    Ok(())
  }

  #[cfg(test)]
  fn remove_edge(&mut self, course: Uuid, prerequisite: Uuid) {
    let (Some(&c), Some(&p)) =
      (self.index.get(&course), self.index.get(&prerequisite))
    else {
      return;
    };
    self.nodes[c].requires.retain(|n| *n != p);
    self.nodes[p].required_by.retain(|n| *n != c);
  }

  /// Three-colour depth-first search over the whole arena.
  pub fn has_cycle(&self) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
      New,
      Open,
      Done,
    }

    let mut marks = vec![Mark::New; self.nodes.len()];
    for root in 0..self.nodes.len() {
      if marks[root] != Mark::New {
        continue;
      }
      marks[root] = Mark::Open;
      let mut stack = vec![(root, 0usize)];
      while let Some(top) = stack.last_mut() {
        let (ix, cursor) = *top;
        match self.nodes[ix].requires.get(cursor) {
          Some(&child) => {
            top.1 += 1;
            match marks[child] {
              Mark::Open => return true,
              Mark::New => {
                marks[child] = Mark::Open;
                stack.push((child, 0));
              }
              Mark::Done => {}
            }
          }
          None => {
            marks[ix] = Mark::Done;
            stack.pop();
          }
        }
      }
    }
    false
  }

  fn node(&mut self, id: Uuid) -> usize {
    if let Some(&ix) = self.index.get(&id) {
      return ix;
    }
    let ix = self.nodes.len();
    self.nodes.push(Node {
      course_id:   id,
      requires:    Vec::new(),
      required_by: Vec::new(),
    });
    self.index.insert(id, ix);
    ix
  }

  fn link(&mut self, course: Uuid, prerequisite: Uuid) {
    let c = self.node(course);
    let p = self.node(prerequisite);
    if !self.nodes[c].requires.contains(&p) {
      self.nodes[c].requires.push(p);
      self.nodes[p].required_by.push(c);
    }
  }

  fn neighbours(
    &self,
    id: Uuid,
    edges: impl Fn(&Node) -> &Vec<usize>,
  ) -> BTreeSet<Uuid> {
    self
      .index
      .get(&id)
      .map(|&ix| {
        edges(&self.nodes[ix])
          .iter()
          .map(|n| self.nodes[*n].course_id)
          .collect()
      })
      .unwrap_or_default()
  }
}

// ─── Engine operations ───────────────────────────────────────────────────────

fn require_course(store: &impl CatalogStore, id: Uuid) -> Result<Course> {
  store
    .find_course_by_id(id)?
    .ok_or(Error::NotFound(Entity::Course, id))
}

/// Validate a full candidate prerequisite set for `course_id` against the
/// current graph. Nothing is written.
fn check_prerequisites(
  store: &impl CatalogStore,
  graph: &PrerequisiteGraph,
  course_id: Uuid,
  candidates: &BTreeSet<Uuid>,
) -> Result<()> {
  for &candidate in candidates {
    require_course(store, candidate)?;
    if let Err(violation) = graph.check_edge(course_id, candidate) {
      warn!(%course_id, %candidate, %violation, "rejected prerequisite");
      return Err(violation.into());
    }
  }
  Ok(())
}

/// Fail if `code` belongs to any course other than `owner`.
fn ensure_code_free(
  store: &impl CatalogStore,
  code: &str,
  owner: Option<Uuid>,
) -> Result<()> {
  match store.find_course_by_code(code)? {
    Some(existing) if Some(existing.course_id) != owner => {
      warn!(code, "duplicate course code");
      Err(Conflict::DuplicateCode(code.to_owned()).into())
    }
    _ => Ok(()),
  }
}

pub fn create_course(
  store: &mut impl CatalogStore,
  input: NewCourse,
) -> Result<Course> {
  let code = input.code.trim().to_owned();
  let name = input.name.trim().to_owned();
  validate_fields(&code, &name, input.credits)?;
  ensure_code_free(&*store, &code, None)?;

  let course = Course::new(Uuid::new_v4(), code, name, input.credits);
  let graph = PrerequisiteGraph::load(&*store)?;
  check_prerequisites(&*store, &graph, course.course_id, &input.prerequisites)?;

  store.save_course(&course)?;
  store.replace_prerequisites(course.course_id, &input.prerequisites)?;
  info!(course_id = %course.course_id, code = %course.code, "course created");

  require_course(&*store, course.course_id)
}

pub fn update_course(
  store: &mut impl CatalogStore,
  course_id: Uuid,
  update: CourseUpdate,
) -> Result<Course> {
  let mut course = require_course(&*store, course_id)?;
  let code = update.code.trim().to_owned();
  let name = update.name.trim().to_owned();
  validate_fields(&code, &name, update.credits)?;
  ensure_code_free(&*store, &code, Some(course_id))?;

  if let Some(candidates) = &update.prerequisites {
    let graph = PrerequisiteGraph::load(&*store)?;
    check_prerequisites(&*store, &graph, course_id, candidates)?;
  }

  course.code = code;
  course.name = name;
  course.credits = update.credits;
  store.save_course(&course)?;
  if let Some(candidates) = &update.prerequisites {
    store.replace_prerequisites(course_id, candidates)?;
  }
  info!(%course_id, "course updated");

  require_course(&*store, course_id)
}

pub fn delete_course(store: &mut impl CatalogStore, course_id: Uuid) -> Result<()> {
  let course = require_course(&*store, course_id)?;

  if !course.required_by.is_empty() {
    warn!(
      %course_id,
      dependents = course.required_by.len(),
      "refusing to delete a course that other courses require"
    );
    return Err(
      Conflict::StillRequired { course_id, dependents: course.required_by.len() }
        .into(),
    );
  }
  if store.course_has_enrollments(course_id)? {
    warn!(%course_id, "refusing to delete a course with enrollments");
    return Err(Conflict::HasEnrollments(course_id).into());
  }

  store.delete_course_by_id(course_id)?;
  info!(%course_id, "course deleted");
  Ok(())
}

/// Add a single `course requires prerequisite` edge.
pub fn add_prerequisite_edge(
  store: &mut impl CatalogStore,
  course_id: Uuid,
  prerequisite_id: Uuid,
) -> Result<Course> {
  require_course(&*store, course_id)?;
  let graph = PrerequisiteGraph::load(&*store)?;
  check_prerequisites(
    &*store,
    &graph,
    course_id,
    &BTreeSet::from([prerequisite_id]),
  )?;

  store.add_prerequisite(course_id, prerequisite_id)?;
  info!(%course_id, %prerequisite_id, "prerequisite added");
  require_course(&*store, course_id)
}

pub fn remove_prerequisite_edge(
  store: &mut impl CatalogStore,
  course_id: Uuid,
  prerequisite_id: Uuid,
) -> Result<Course> {
  require_course(&*store, course_id)?;
  store.remove_prerequisite(course_id, prerequisite_id)?;
  info!(%course_id, %prerequisite_id, "prerequisite removed");
  require_course(&*store, course_id)
}
