/**
 * Directory Lookup
 *
 * Identity and organization data is owned elsewhere in the platform; this
 * backend only reads it. The `Directory` trait is the seam: the membership
 * engine and the case services resolve users, organizations and project
 * membership through it and never touch the reference tables directly.
 */

mod memory;
mod pg;

pub use memory::InMemoryDirectory;
pub use pg::PgDirectory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::error::CoreResult;
use crate::shared::org::{Organization, Role, UserProfile};

/// Read-only identity/organization lookup.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up a user profile (organization standing plus roles).
    async fn user(&self, id: Uuid) -> CoreResult<Option<UserProfile>>;

    /// Look up an organization.
    async fn organization(&self, id: Uuid) -> CoreResult<Option<Organization>>;

    /// All members of an organization, optionally narrowed to one role.
    async fn org_members(&self, org_id: Uuid, role: Option<Role>)
        -> CoreResult<Vec<UserProfile>>;

    /// All members assigned to a project.
    async fn project_members(&self, project_id: Uuid) -> CoreResult<Vec<UserProfile>>;

    /// Whether the user is assigned to the project.
    async fn is_project_member(&self, project_id: Uuid, user_id: Uuid) -> CoreResult<bool>;

    /// The organization a project belongs to.
    async fn project_org(&self, project_id: Uuid) -> CoreResult<Option<Uuid>>;
}
