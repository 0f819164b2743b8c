// src/report/attempts.rs

use async_trait::async_trait;

use crate::{
    context::RequestContext,
    error::AppError,
    models::{
        course::{Course, CourseModule, Group, GroupMode},
        quiz::Quiz,
        user::Capability,
    },
};

/// Who an attempts report covers for the current request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportScope {
    pub current_group: Option<i64>,
    /// Students enrolled in the course.
    pub students: Vec<i64>,
    /// Students in the current group; empty when no group is selected.
    pub group_students: Vec<i64>,
    /// Users whose attempts may be listed and acted on.
    pub allowed: Vec<i64>,
}

impl ReportScope {
    pub fn has_students(&self) -> bool {
        !self.students.is_empty() && (self.current_group.is_none() || !self.group_students.is_empty())
    }
}

/// Setup shared by the reports that list quiz attempts.
#[async_trait]
pub trait AttemptsReport: Send + Sync {
    async fn initialize(
        &self,
        ctx: &RequestContext,
        report_name: &str,
        quiz: &Quiz,
        cm: &CourseModule,
        course: &Course,
        requested_group: Option<i64>,
    ) -> Result<ReportScope, AppError>;
}

/// Resolves the group and student lists from course enrolments and groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupScopedAttempts;

#[async_trait]
impl AttemptsReport for GroupScopedAttempts {
    async fn initialize(
        &self,
        ctx: &RequestContext,
        report_name: &str,
        quiz: &Quiz,
        cm: &CourseModule,
        course: &Course,
        requested_group: Option<i64>,
    ) -> Result<ReportScope, AppError> {
        let current_group = current_group(ctx, cm, course, requested_group).await?;
        let students = ctx.store.enrolled_students(course.id).await?;

        let scope = match current_group {
            None => ReportScope {
                current_group,
                allowed: students.clone(),
                students,
                group_students: Vec::new(),
            },
            Some(group) => {
                let members = ctx.store.group_members(group).await?;
                let group_students: Vec<i64> =
                    students.iter().copied().filter(|s| members.contains(s)).collect();
                ReportScope {
                    current_group,
                    students,
                    allowed: group_students.clone(),
                    group_students,
                }
            }
        };

        tracing::debug!(
            report = report_name,
            quiz_id = quiz.id,
            group = ?scope.current_group,
            students = scope.students.len(),
            allowed = scope.allowed.len(),
            "Report scope resolved"
        );
        Ok(scope)
    }
}

/// Groups the current user may pick in this activity.
pub async fn available_groups(
    ctx: &RequestContext,
    cm: &CourseModule,
    course: &Course,
) -> Result<Vec<Group>, AppError> {
    match cm.group_mode() {
        GroupMode::None => Ok(Vec::new()),
        GroupMode::Separate if !ctx.user.has(Capability::AccessAllGroups) => {
            ctx.store.user_groups(course.id, ctx.user.id).await
        }
        _ => ctx.store.course_groups(course.id).await,
    }
}

/// The requested group if the user may see it, otherwise the default for the
/// group mode: the user's first group in separate groups, all participants
/// everywhere else.
async fn current_group(
    ctx: &RequestContext,
    cm: &CourseModule,
    course: &Course,
    requested_group: Option<i64>,
) -> Result<Option<i64>, AppError> {
    let mode = cm.group_mode();
    if mode == GroupMode::None {
        return Ok(None);
    }

    let groups = available_groups(ctx, cm, course).await?;
    let restricted = mode == GroupMode::Separate && !ctx.user.has(Capability::AccessAllGroups);

    match requested_group {
        Some(0) if !restricted => return Ok(None),
        Some(id) if groups.iter().any(|g| g.id == id) => return Ok(Some(id)),
        _ => {}
    }

    if restricted {
        return groups
            .first()
            .map(|g| Some(g.id))
            .ok_or_else(|| AppError::Forbidden("You are not a member of any group".to_string()));
    }
    Ok(None)
}
