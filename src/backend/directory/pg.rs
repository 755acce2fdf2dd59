/**
 * Postgres Directory
 *
 * Reads the local reference tables (organizations, users, projects,
 * project_members). Role and org-kind columns are stored as their wire
 * strings; unknown values are skipped rather than failing the whole lookup.
 */

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::shared::error::CoreResult;
use crate::shared::org::{OrgKind, Organization, Role, UserProfile};

use super::Directory;

/// Directory backed by the local Postgres reference tables.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a joined users/organizations row into a profile.
///
/// Expects columns: id, org_id, org_kind, display_name, email, roles.
fn profile_from_row(row: &sqlx::postgres::PgRow) -> UserProfile {
    let kind_str: String = row.get("org_kind");
    let roles: Vec<String> = row.get("roles");

    UserProfile {
        id: row.get("id"),
        org_id: row.get("org_id"),
        org_kind: OrgKind::parse(&kind_str).unwrap_or(OrgKind::Tenant),
        display_name: row.get("display_name"),
        email: row.get("email"),
        roles: roles.iter().filter_map(|r| Role::parse(r)).collect(),
    }
}

const PROFILE_COLUMNS: &str = r#"
    u.id, u.org_id, o.kind AS org_kind, u.display_name, u.email, u.roles
"#;

#[async_trait]
impl Directory for PgDirectory {
    async fn user(&self, id: Uuid) -> CoreResult<Option<UserProfile>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM users u
            JOIN organizations o ON o.id = u.org_id
            WHERE u.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn organization(&self, id: Uuid) -> CoreResult<Option<Organization>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, kind, parent_org_id
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let kind_str: String = row.get("kind");
            Organization {
                id: row.get("id"),
                name: row.get("name"),
                kind: OrgKind::parse(&kind_str).unwrap_or(OrgKind::Tenant),
                parent_org_id: row.get("parent_org_id"),
            }
        }))
    }

    async fn org_members(
        &self,
        org_id: Uuid,
        role: Option<Role>,
    ) -> CoreResult<Vec<UserProfile>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM users u
            JOIN organizations o ON o.id = u.org_id
            WHERE u.org_id = $1
              AND ($2::TEXT IS NULL OR $2 = ANY(u.roles))
            ORDER BY u.display_name
            "#
        ))
        .bind(org_id)
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(profile_from_row).collect())
    }

    async fn project_members(&self, project_id: Uuid) -> CoreResult<Vec<UserProfile>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            JOIN organizations o ON o.id = u.org_id
            WHERE pm.project_id = $1
            ORDER BY u.display_name
            "#
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(profile_from_row).collect())
    }

    async fn is_project_member(&self, project_id: Uuid, user_id: Uuid) -> CoreResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM project_members
                WHERE project_id = $1 AND user_id = $2
            ) AS is_member
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("is_member"))
    }

    async fn project_org(&self, project_id: Uuid) -> CoreResult<Option<Uuid>> {
        let row = sqlx::query(r#"SELECT org_id FROM projects WHERE id = $1"#)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("org_id")))
    }
}
