//! Membership policy table
//!
//! One pure function pair decides who may act on a conversation, keyed by
//! (conversation kind, the user's org kind and roles, their relation to the
//! case parties). All role logic lives here; the service layer only
//! resolves the inputs and materializes the outcome. No I/O.

use crate::shared::chat::ConversationKind;
use crate::shared::org::{OrgKind, Role, UserProfile};

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Allowed, and the user must silently join the case's internal
    /// conversation as well (provider users entering an external chat).
    AllowWithEscalation,
    Deny(DenyReason),
}

/// Why a policy check failed. The service layer maps these to the error
/// taxonomy: role violations are constraint errors with a reason code,
/// standing problems are plain Forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Field technicians and procurement staff never enter external chats
    RoleForbiddenInExternalChat,
    /// Internal conversations are provider-organization-only
    NotProviderOrg,
    /// No relation to the case grants this action
    NoCaseStanding,
}

/// A user's relation to one case, resolved by the service layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseStanding {
    pub is_creator: bool,
    pub is_recipient: bool,
    /// Admin role held inside the case's provider organization
    pub is_provider_admin: bool,
    /// Provider management role (coordinator/PM/assistant PM) and assigned
    /// to the case's project
    pub is_project_management: bool,
    /// Member of the recipient's organization
    pub in_recipient_org: bool,
    /// Member of the case's provider organization
    pub in_provider_org: bool,
    /// Assigned to the case's project
    pub is_project_member: bool,
}

fn escalate_for(user: &UserProfile) -> Decision {
    if user.org_kind == OrgKind::Provider {
        Decision::AllowWithEscalation
    } else {
        Decision::Allow
    }
}

/// May this user read a case conversation (and be lazily enrolled on post)?
///
/// Ad-hoc chats (direct/group/channel) carry no case parties; the table
/// allows them here and the service falls back to plain participant checks.
pub fn case_access(kind: ConversationKind, user: &UserProfile, standing: &CaseStanding) -> Decision {
    match kind {
        ConversationKind::External => {
            if user.has_forbidden_external_role() {
                return Decision::Deny(DenyReason::RoleForbiddenInExternalChat);
            }
            if standing.is_creator
                || standing.is_recipient
                || standing.is_provider_admin
                || standing.is_project_management
            {
                escalate_for(user)
            } else {
                Decision::Deny(DenyReason::NoCaseStanding)
            }
        }
        ConversationKind::Internal => {
            if user.org_kind != OrgKind::Provider {
                return Decision::Deny(DenyReason::NotProviderOrg);
            }
            if standing.is_creator
                || standing.is_recipient
                || standing.is_provider_admin
                || standing.is_project_management
                || (standing.in_provider_org && standing.is_project_member)
            {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NoCaseStanding)
            }
        }
        ConversationKind::Direct | ConversationKind::Group | ConversationKind::Channel => {
            Decision::Allow
        }
    }
}

/// May this user be added to the conversation as a participant?
pub fn addable(kind: ConversationKind, candidate: &UserProfile, standing: &CaseStanding) -> Decision {
    match kind {
        ConversationKind::External => {
            // The role ban holds regardless of who asks.
            if candidate.has_forbidden_external_role() {
                return Decision::Deny(DenyReason::RoleForbiddenInExternalChat);
            }
            if standing.is_creator
                || standing.is_recipient
                || standing.is_provider_admin
                || standing.is_project_management
                || (standing.in_recipient_org && standing.is_project_member)
            {
                escalate_for(candidate)
            } else {
                Decision::Deny(DenyReason::NoCaseStanding)
            }
        }
        ConversationKind::Internal => {
            if candidate.org_kind != OrgKind::Provider {
                return Decision::Deny(DenyReason::NotProviderOrg);
            }
            if standing.is_provider_admin
                || standing.is_project_management
                || (standing.in_provider_org && standing.is_project_member)
            {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NoCaseStanding)
            }
        }
        ConversationKind::Direct | ConversationKind::Group | ConversationKind::Channel => {
            Decision::Allow
        }
    }
}

/// Roles that can never appear in an external conversation.
pub fn forbidden_external_roles() -> [Role; 2] {
    [Role::FieldTechnician, Role::ProcurementStaff]
}
