//! Organization and Identity Shapes
//!
//! Data returned by the directory lookup (see `backend::directory`). The
//! backend never mutates these records; organization and project CRUD is
//! handled elsewhere in the platform.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of organization a user belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrgKind {
    /// Service provider running projects (facility management side)
    Provider,
    /// Property owner / managing beneficiary
    Beneficiary,
    /// Tenant organization (requesting side)
    Tenant,
}

impl OrgKind {
    /// String form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgKind::Provider => "provider",
            OrgKind::Beneficiary => "beneficiary",
            OrgKind::Tenant => "tenant",
        }
    }

    /// Parse from the database string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "provider" => Some(OrgKind::Provider),
            "beneficiary" => Some(OrgKind::Beneficiary),
            "tenant" => Some(OrgKind::Tenant),
            _ => None,
        }
    }
}

/// Platform role carried by a user. Tenant-side users typically have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    Coordinator,
    ProjectManager,
    AssistantProjectManager,
    FieldTechnician,
    ProcurementStaff,
}

impl Role {
    /// String form used in the database (`users.roles` TEXT[])
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coordinator => "coordinator",
            Role::ProjectManager => "projectManager",
            Role::AssistantProjectManager => "assistantProjectManager",
            Role::FieldTechnician => "fieldTechnician",
            Role::ProcurementStaff => "procurementStaff",
        }
    }

    /// Parse from the database string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "coordinator" => Some(Role::Coordinator),
            "projectManager" => Some(Role::ProjectManager),
            "assistantProjectManager" => Some(Role::AssistantProjectManager),
            "fieldTechnician" => Some(Role::FieldTechnician),
            "procurementStaff" => Some(Role::ProcurementStaff),
            _ => None,
        }
    }

    /// Roles that may never be added to an external conversation, no matter
    /// who asks.
    pub fn forbidden_in_external(&self) -> bool {
        matches!(self, Role::FieldTechnician | Role::ProcurementStaff)
    }

    /// Provider-side management roles that join a case's external chat when
    /// assigned to its project.
    pub fn is_provider_management(&self) -> bool {
        matches!(
            self,
            Role::Coordinator | Role::ProjectManager | Role::AssistantProjectManager
        )
    }
}

/// An organization as seen by the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub kind: OrgKind,
    /// Parent provider organization, when this org is managed by one
    pub parent_org_id: Option<Uuid>,
}

/// A user as seen by the directory: organization standing plus roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub org_id: Uuid,
    pub org_kind: OrgKind,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl UserProfile {
    /// Check whether the user carries the given role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Admin of a provider organization
    pub fn is_provider_admin(&self) -> bool {
        self.org_kind == OrgKind::Provider && self.has_role(Role::Admin)
    }

    /// Any role that is forbidden in external conversations
    pub fn has_forbidden_external_role(&self) -> bool {
        self.roles.iter().any(Role::forbidden_in_external)
    }

    /// Any provider-side management role (coordinator / PM / assistant PM)
    pub fn has_provider_management_role(&self) -> bool {
        self.org_kind == OrgKind::Provider && self.roles.iter().any(Role::is_provider_management)
    }
}
