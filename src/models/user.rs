// src/models/user.rs

use serde::Serialize;

use crate::{error::AppError, utils::jwt::Claims};

/// Things a role may do around quiz reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Capability {
    /// Open the quiz reports.
    ViewReports,
    /// Delete other users' attempts from the report.
    DeleteAttempts,
    /// See every group in separate-groups activities.
    AccessAllGroups,
    /// See grades in reports.
    ViewGrades,
}

/// The authenticated user of the current request.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,

    /// User role: 'admin', 'teacher', 'noneditingteacher' or 'student'.
    pub role: String,

    pub capabilities: Vec<Capability>,
}

impl CurrentUser {
    pub fn new(id: i64, role: &str) -> Self {
        Self {
            id,
            role: role.to_owned(),
            capabilities: capabilities_for_role(role),
        }
    }

    /// Builds the user from verified token claims.
    pub fn from_claims(claims: &Claims) -> Result<Self, AppError> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;
        Ok(Self::new(id, &claims.role))
    }

    /// The same user acting under their enrolment role in one course.
    /// Site administrators keep their own role.
    pub fn in_course(&self, course_role: &str) -> Self {
        if self.is_admin() {
            return self.clone();
        }
        Self::new(self.id, course_role)
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Fails with `Forbidden` when the capability is missing.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Missing capability: {:?}",
                capability
            )))
        }
    }
}

fn capabilities_for_role(role: &str) -> Vec<Capability> {
    use Capability::*;

    match role {
        "admin" | "manager" | "teacher" => {
            vec![ViewReports, DeleteAttempts, AccessAllGroups, ViewGrades]
        }
        "noneditingteacher" => vec![ViewReports, ViewGrades],
        _ => Vec::new(),
    }
}
