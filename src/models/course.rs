// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
}

/// Represents the 'course_modules' table.
/// Links an activity instance (e.g. a quiz) to the course that hosts it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: i64,
    pub course: i64,
    /// Activity type, e.g. `quiz` or `thesis`.
    pub modname: String,
    /// Id of the activity record in its own table.
    pub instance: i64,
    pub name: String,
    /// 0 = no groups, 1 = separate groups, 2 = visible groups.
    pub groupmode: i16,
    pub visible: bool,
}

impl CourseModule {
    pub fn group_mode(&self) -> GroupMode {
        GroupMode::from_db(self.groupmode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    None,
    Separate,
    Visible,
}

impl GroupMode {
    pub fn from_db(value: i16) -> Self {
        match value {
            1 => GroupMode::Separate,
            2 => GroupMode::Visible,
            _ => GroupMode::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GroupMode::None => "No groups",
            GroupMode::Separate => "Separate groups",
            GroupMode::Visible => "Visible groups",
        }
    }
}

/// Represents the 'groups' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub courseid: i64,
    pub name: String,
}
