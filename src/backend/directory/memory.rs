/**
 * In-Memory Directory
 *
 * Seeded directory for tests and local development. Populate it before
 * wrapping it in an `Arc<dyn Directory>`; the lookup side is read-only.
 */

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::error::CoreResult;
use crate::shared::org::{Organization, Role, UserProfile};

use super::Directory;

/// Directory backed by in-process maps.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: HashMap<Uuid, UserProfile>,
    orgs: HashMap<Uuid, Organization>,
    project_orgs: HashMap<Uuid, Uuid>,
    project_members: HashMap<Uuid, HashSet<Uuid>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_org(&mut self, org: Organization) -> &mut Self {
        self.orgs.insert(org.id, org);
        self
    }

    pub fn add_user(&mut self, user: UserProfile) -> &mut Self {
        self.users.insert(user.id, user);
        self
    }

    pub fn add_project(&mut self, project_id: Uuid, org_id: Uuid) -> &mut Self {
        self.project_orgs.insert(project_id, org_id);
        self
    }

    pub fn assign_to_project(&mut self, project_id: Uuid, user_id: Uuid) -> &mut Self {
        self.project_members
            .entry(project_id)
            .or_default()
            .insert(user_id);
        self
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn user(&self, id: Uuid) -> CoreResult<Option<UserProfile>> {
        Ok(self.users.get(&id).cloned())
    }

    async fn organization(&self, id: Uuid) -> CoreResult<Option<Organization>> {
        Ok(self.orgs.get(&id).cloned())
    }

    async fn org_members(
        &self,
        org_id: Uuid,
        role: Option<Role>,
    ) -> CoreResult<Vec<UserProfile>> {
        let mut members: Vec<UserProfile> = self
            .users
            .values()
            .filter(|u| u.org_id == org_id)
            .filter(|u| role.map_or(true, |r| u.has_role(r)))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(members)
    }

    async fn project_members(&self, project_id: Uuid) -> CoreResult<Vec<UserProfile>> {
        let ids = self.project_members.get(&project_id);
        let mut members: Vec<UserProfile> = self
            .users
            .values()
            .filter(|u| ids.is_some_and(|ids| ids.contains(&u.id)))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(members)
    }

    async fn is_project_member(&self, project_id: Uuid, user_id: Uuid) -> CoreResult<bool> {
        Ok(self
            .project_members
            .get(&project_id)
            .is_some_and(|ids| ids.contains(&user_id)))
    }

    async fn project_org(&self, project_id: Uuid) -> CoreResult<Option<Uuid>> {
        Ok(self.project_orgs.get(&project_id).copied())
    }
}
