//! Subcommands and their dispatch onto a [`Registry`].

use std::collections::BTreeSet;

use anyhow::{Context as _, Result, bail};
use clap::Subcommand;
use registro_core::{
  course::{Course, CourseUpdate, NewCourse},
  enrollment::{EnrollmentPatch, EnrollmentStatus, NewEnrollment},
  graph::PrerequisiteGraph,
  registry::Registry,
  student::NewStudent,
};
use serde::Serialize;
use uuid::Uuid;

// ─── Commands ─────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Manage the course catalog and its prerequisite graph.
  #[command(subcommand)]
  Course(CourseCommand),

  #[command(subcommand)]
  Student(StudentCommand),

  /// Enroll a student in a course.
  Enroll { student: Uuid, course: Uuid },

  #[command(subcommand)]
  Enrollment(EnrollmentCommand),

  /// Verify that the stored prerequisite graph is acyclic.
  Check,
}

#[derive(Subcommand, Debug)]
pub enum CourseCommand {
  Add {
    code:     String,
    name:     String,
    credits:  u32,
    /// Prerequisite course id; repeat for several.
    #[arg(long = "requires", value_name = "COURSE")]
    requires: Vec<Uuid>,
  },
  /// Change a course. Omitted fields keep their current value; the
  /// prerequisite set is only replaced when `--requires` or
  /// `--clear-requires` is given.
  Update {
    id:             Uuid,
    #[arg(long)]
    code:           Option<String>,
    #[arg(long)]
    name:           Option<String>,
    #[arg(long)]
    credits:        Option<u32>,
    #[arg(long = "requires", value_name = "COURSE")]
    requires:       Vec<Uuid>,
    #[arg(long, conflicts_with = "requires")]
    clear_requires: bool,
  },
  Delete { id: Uuid },
  List,
  /// Show a course by id or code.
  Show { course: String },
  /// Add a single prerequisite edge.
  Require { course: Uuid, prerequisite: Uuid },
  /// Remove a single prerequisite edge.
  Unrequire { course: Uuid, prerequisite: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum StudentCommand {
  Add { name: String },
  Deactivate {
    id:     Uuid,
    #[arg(long)]
    reason: Option<String>,
  },
  List,
  Show { id: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum EnrollmentCommand {
  /// Cancel an enrollment. The record is kept.
  Withdraw { id: Uuid },
  Update {
    id:           Uuid,
    #[arg(long)]
    status:       Option<EnrollmentStatus>,
    #[arg(long)]
    cancelled_by: Option<String>,
  },
  List {
    #[arg(long)]
    student: Option<Uuid>,
  },
  Show { id: Uuid },
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

pub async fn run<R: Registry>(
  registry: &R,
  command: Command,
  actor: String,
) -> Result<()> {
  match command {
    Command::Course(cmd) => course(registry, cmd).await,
    Command::Student(cmd) => student(registry, cmd, actor).await,
    Command::Enroll { student, course } => {
      let enrollment = registry
        .create_enrollment(NewEnrollment::new(student, course), actor)
        .await
        .context("enrollment rejected")?;
      print_json(&enrollment)
    }
    Command::Enrollment(cmd) => enrollment(registry, cmd, actor).await,
    Command::Check => check(registry).await,
  }
}

async fn course<R: Registry>(registry: &R, cmd: CourseCommand) -> Result<()> {
  match cmd {
    CourseCommand::Add { code, name, credits, requires } => {
      let course = registry
        .create_course(NewCourse {
          code,
          name,
          credits,
          prerequisites: requires.into_iter().collect(),
        })
        .await
        .context("failed to create course")?;
      print_json(&course)
    }
    CourseCommand::Update {
      id,
      code,
      name,
      credits,
      requires,
      clear_requires,
    } => {
      let Some(current) = registry.get_course(id).await? else {
        bail!("course not found: {id}");
      };
      let prerequisites = (clear_requires || !requires.is_empty())
        .then(|| requires.into_iter().collect::<BTreeSet<_>>());
      let course = registry
        .update_course(id, CourseUpdate {
          code: code.unwrap_or(current.code),
          name: name.unwrap_or(current.name),
          credits: credits.unwrap_or(current.credits),
          prerequisites,
        })
        .await
        .context("failed to update course")?;
      print_json(&course)
    }
    CourseCommand::Delete { id } => {
      registry
        .delete_course(id)
        .await
        .context("failed to delete course")?;
      println!("deleted {id}");
      Ok(())
    }
    CourseCommand::List => print_json(&registry.list_courses().await?),
    CourseCommand::Show { course } => {
      let found = match course.parse::<Uuid>() {
        Ok(id) => registry.get_course(id).await?,
        Err(_) => registry.get_course_by_code(&course).await?,
      };
      match found {
        Some(c) => print_json(&c),
        None => bail!("course not found: {course}"),
      }
    }
    CourseCommand::Require { course, prerequisite } => {
      let course = registry
        .add_prerequisite(course, prerequisite)
        .await
        .context("failed to add prerequisite")?;
      print_json(&course)
    }
    CourseCommand::Unrequire { course, prerequisite } => {
      let course = registry
        .remove_prerequisite(course, prerequisite)
        .await
        .context("failed to remove prerequisite")?;
      print_json(&course)
    }
  }
}

async fn student<R: Registry>(
  registry: &R,
  cmd: StudentCommand,
  actor: String,
) -> Result<()> {
  match cmd {
    StudentCommand::Add { name } => {
      let student = registry
        .register_student(NewStudent { name })
        .await
        .context("failed to register student")?;
      print_json(&student)
    }
    StudentCommand::Deactivate { id, reason } => {
      let student = registry
        .deactivate_student(id, actor, reason)
        .await
        .context("failed to deactivate student")?;
      print_json(&student)
    }
    StudentCommand::List => print_json(&registry.list_students().await?),
    StudentCommand::Show { id } => match registry.get_student(id).await? {
      Some(s) => print_json(&s),
      None => bail!("student not found: {id}"),
    },
  }
}

async fn enrollment<R: Registry>(
  registry: &R,
  cmd: EnrollmentCommand,
  actor: String,
) -> Result<()> {
  match cmd {
    EnrollmentCommand::Withdraw { id } => {
      let enrollment = registry
        .withdraw_enrollment(id, actor)
        .await
        .context("failed to withdraw enrollment")?;
      print_json(&enrollment)
    }
    EnrollmentCommand::Update { id, status, cancelled_by } => {
      let enrollment = registry
        .update_enrollment(id, EnrollmentPatch {
          status,
          cancelled_by,
          ..Default::default()
        })
        .await
        .context("failed to update enrollment")?;
      print_json(&enrollment)
    }
    EnrollmentCommand::List { student: Some(id) } => {
      print_json(&registry.list_enrollments_by_student(id).await?)
    }
    EnrollmentCommand::List { student: None } => {
      print_json(&registry.list_enrollments().await?)
    }
    EnrollmentCommand::Show { id } => match registry.get_enrollment(id).await? {
      Some(e) => print_json(&e),
      None => bail!("enrollment not found: {id}"),
    },
  }
}

async fn check<R: Registry>(registry: &R) -> Result<()> {
  let courses = registry.list_courses().await?;
  let graph = PrerequisiteGraph::from_edges(edges(&courses));
  if graph.has_cycle() {
    bail!("prerequisite graph contains a cycle");
  }
  tracing::info!(courses = courses.len(), "prerequisite graph is acyclic");
  Ok(())
}

fn edges(courses: &[Course]) -> Vec<(Uuid, Uuid)> {
  courses
    .iter()
    .flat_map(|c| c.requires.iter().map(|p| (c.course_id, *p)))
    .collect()
}

fn print_json(value: &impl Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
