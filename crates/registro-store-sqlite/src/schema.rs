//! SQL schema for the Registro SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS courses (
    course_id TEXT PRIMARY KEY,
    code      TEXT NOT NULL UNIQUE,
    name      TEXT NOT NULL,
    credits   INTEGER NOT NULL CHECK (credits > 0)
);

-- `requires` edges. `required_by` is the same table read the other way,
-- so the two directions cannot drift apart.
CREATE TABLE IF NOT EXISTS course_prerequisites (
    course_id       TEXT NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    prerequisite_id TEXT NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    PRIMARY KEY (course_id, prerequisite_id),
    CHECK (course_id != prerequisite_id)
);

CREATE TABLE IF NOT EXISTS students (
    student_id          TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    status              TEXT NOT NULL,   -- 'active' | 'inactive'
    created_at          TEXT NOT NULL,
    modified_by         TEXT,
    modified_at         TEXT,
    deactivated_by      TEXT,
    deactivated_at      TEXT,
    deactivation_reason TEXT
);

-- Enrollments are never deleted; withdrawal sets status = 'cancelled'.
CREATE TABLE IF NOT EXISTS enrollments (
    enrollment_id   TEXT PRIMARY KEY,
    student_id      TEXT NOT NULL REFERENCES students(student_id),
    course_id       TEXT NOT NULL REFERENCES courses(course_id),
    enrollment_date TEXT NOT NULL,   -- YYYY-MM-DD
    status          TEXT NOT NULL,   -- 'active' | 'cancelled'
    created_by      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    cancelled_by    TEXT,
    cancelled_at    TEXT,
    UNIQUE (student_id, course_id)
);

CREATE INDEX IF NOT EXISTS prerequisites_inverse_idx ON course_prerequisites(prerequisite_id);
CREATE INDEX IF NOT EXISTS enrollments_student_idx  ON enrollments(student_id);
CREATE INDEX IF NOT EXISTS enrollments_course_idx   ON enrollments(course_id);

PRAGMA user_version = 1;
";
