//! Membership service
//!
//! Resolves the inputs of the policy table (case parties, the acting user's
//! standing) through the directory, and materializes decisions against the
//! conversation store: auto-enrollment, participant add/remove with the
//! internal-chat guards, initial participant sets at case creation, and the
//! available-to-add listing.

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::backend::chat::store;
use crate::backend::directory::Directory;
use crate::shared::chat::{Conversation, ConversationKind, Participant};
use crate::shared::error::{codes, CoreError, CoreResult};
use crate::shared::org::{OrgKind, Role, UserProfile};

use super::policy::{self, CaseStanding, Decision, DenyReason};

/// The parties of one case, resolved once per request.
///
/// `provider_org_id` follows the chain: the recipient organization's parent
/// provider, else the recipient organization itself when it is a provider,
/// else the project's organization. It can be absent when none of the three
/// resolve.
#[derive(Debug, Clone, Copy)]
pub struct CaseParties {
    pub creator_id: Uuid,
    pub recipient_id: Uuid,
    pub project_id: Uuid,
    pub recipient_org_id: Uuid,
    pub provider_org_id: Option<Uuid>,
}

/// Policy inputs resolver + decision materializer.
#[derive(Clone)]
pub struct MembershipEngine {
    directory: Arc<dyn Directory>,
}

impl MembershipEngine {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Fetch a profile or fail with NotFound.
    pub async fn profile(&self, user_id: Uuid) -> CoreResult<UserProfile> {
        self.directory
            .user(user_id)
            .await?
            .ok_or(CoreError::not_found("user"))
    }

    /// Resolve the parties of a case from its stored fields.
    pub async fn resolve_parties(
        &self,
        creator_id: Uuid,
        recipient_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<CaseParties> {
        let recipient = self.profile(recipient_id).await?;

        let recipient_org = self
            .directory
            .organization(recipient.org_id)
            .await?
            .ok_or(CoreError::not_found("organization"))?;

        let provider_org_id = match recipient_org.parent_org_id {
            Some(parent) => Some(parent),
            None if recipient_org.kind == OrgKind::Provider => Some(recipient_org.id),
            None => self.directory.project_org(project_id).await?,
        };

        Ok(CaseParties {
            creator_id,
            recipient_id,
            project_id,
            recipient_org_id: recipient.org_id,
            provider_org_id,
        })
    }

    /// Compute one user's standing toward the case.
    pub async fn standing(
        &self,
        parties: &CaseParties,
        user: &UserProfile,
    ) -> CoreResult<CaseStanding> {
        let is_project_member = self
            .directory
            .is_project_member(parties.project_id, user.id)
            .await?;
        let in_provider_org = parties.provider_org_id == Some(user.org_id);

        Ok(CaseStanding {
            is_creator: user.id == parties.creator_id,
            is_recipient: user.id == parties.recipient_id,
            is_provider_admin: in_provider_org && user.has_role(Role::Admin),
            is_project_management: is_project_member && user.has_provider_management_role(),
            in_recipient_org: user.org_id == parties.recipient_org_id,
            in_provider_org,
            is_project_member,
        })
    }

    /// Access decision for a user acting on a case conversation.
    pub async fn access_decision(
        &self,
        parties: &CaseParties,
        kind: ConversationKind,
        user: &UserProfile,
    ) -> CoreResult<Decision> {
        let standing = self.standing(parties, user).await?;
        Ok(policy::case_access(kind, user, &standing))
    }

    /// Auto-enroll the acting user into the case conversation they touch.
    ///
    /// Runs at the top of every chat-touching case operation: access is
    /// computed per request, participation is materialized lazily. Entering
    /// the external conversation as a provider user also silently joins the
    /// internal one (escalation).
    pub async fn ensure_active(
        &self,
        conn: &mut PgConnection,
        parties: &CaseParties,
        conversation: &Conversation,
        internal_conversation_id: Uuid,
        user: &UserProfile,
    ) -> CoreResult<Participant> {
        let decision = self
            .access_decision(parties, conversation.kind, user)
            .await?;
        deny_to_error(decision)?;

        let participant =
            store::set_participant_active(&mut *conn, conversation.id, user.id, true).await?;

        if decision == Decision::AllowWithEscalation && conversation.kind == ConversationKind::External
        {
            store::set_participant_active(&mut *conn, internal_conversation_id, user.id, true)
                .await?;
        }

        Ok(participant)
    }

    /// Add a user to a case conversation, enforcing the policy table.
    ///
    /// The forbidden-role rule holds regardless of caller privilege;
    /// provider users added to the external chat are escalated into the
    /// internal one.
    pub async fn add_participant(
        &self,
        conn: &mut PgConnection,
        parties: &CaseParties,
        conversation: &Conversation,
        internal_conversation_id: Uuid,
        candidate_id: Uuid,
    ) -> CoreResult<Participant> {
        let candidate = self.profile(candidate_id).await?;
        let standing = self.standing(parties, &candidate).await?;
        let decision = policy::addable(conversation.kind, &candidate, &standing);
        deny_to_error(decision)?;

        let participant =
            store::set_participant_active(&mut *conn, conversation.id, candidate_id, true).await?;

        if decision == Decision::AllowWithEscalation && conversation.kind == ConversationKind::External
        {
            store::set_participant_active(&mut *conn, internal_conversation_id, candidate_id, true)
                .await?;
        }

        Ok(participant)
    }

    /// Deactivate a participant.
    ///
    /// In an internal conversation, removing a tenant/beneficiary user who
    /// is the last active member of their organization there is blocked so
    /// the recipient-side voice is never lost.
    pub async fn remove_participant(
        &self,
        conn: &mut PgConnection,
        conversation: &Conversation,
        user_id: Uuid,
    ) -> CoreResult<Participant> {
        if conversation.kind == ConversationKind::Internal {
            let candidate = self.profile(user_id).await?;
            if candidate.org_kind != OrgKind::Provider
                && self
                    .is_last_org_member(conn, conversation.id, &candidate)
                    .await?
            {
                return Err(CoreError::constraint(
                    codes::LAST_ORG_PARTICIPANT,
                    "cannot remove the last member of their organization from an internal chat",
                ));
            }
        }

        store::set_participant_active(&mut *conn, conversation.id, user_id, false).await
    }

    async fn is_last_org_member(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        candidate: &UserProfile,
    ) -> CoreResult<bool> {
        let org_member_ids: HashSet<Uuid> = self
            .directory
            .org_members(candidate.org_id, None)
            .await?
            .into_iter()
            .map(|member| member.id)
            .collect();

        let others = store::active_participants(&mut *conn, conversation_id)
            .await?
            .into_iter()
            .filter(|p| p.user_id != candidate.id)
            .filter(|p| org_member_ids.contains(&p.user_id))
            .count();

        Ok(others == 0)
    }

    /// Initial participant sets for a new case: `(external, internal)`.
    ///
    /// External: creator, recipient, and every provider management role
    /// assigned to the project. Internal: the provider-side subset of the
    /// same people; legitimately empty for fully non-provider cases.
    pub async fn initial_participants(
        &self,
        parties: &CaseParties,
    ) -> CoreResult<(Vec<Uuid>, Vec<Uuid>)> {
        let creator = self.profile(parties.creator_id).await?;
        let recipient = self.profile(parties.recipient_id).await?;

        let mut external: Vec<UserProfile> = vec![creator, recipient];
        for member in self.directory.project_members(parties.project_id).await? {
            if member.has_provider_management_role() {
                external.push(member);
            }
        }

        let mut seen = HashSet::new();
        external.retain(|profile| seen.insert(profile.id));

        let internal: Vec<Uuid> = external
            .iter()
            .filter(|profile| profile.org_kind == OrgKind::Provider)
            .map(|profile| profile.id)
            .collect();
        let external: Vec<Uuid> = external.iter().map(|profile| profile.id).collect();

        Ok((external, internal))
    }

    /// Users that can still be added to a case conversation.
    ///
    /// Union of the provider organization's admins and the project members
    /// eligible for the conversation kind, minus active participants and,
    /// externally, minus the forbidden roles.
    pub async fn available_participants(
        &self,
        conn: &mut PgConnection,
        parties: &CaseParties,
        conversation: &Conversation,
    ) -> CoreResult<Vec<UserProfile>> {
        let mut pool: Vec<UserProfile> = Vec::new();

        if let Some(provider_org_id) = parties.provider_org_id {
            pool.extend(
                self.directory
                    .org_members(provider_org_id, Some(Role::Admin))
                    .await?,
            );
        }

        for member in self.directory.project_members(parties.project_id).await? {
            let eligible = match conversation.kind {
                ConversationKind::External => {
                    member.has_provider_management_role()
                        || member.org_id == parties.recipient_org_id
                }
                ConversationKind::Internal => {
                    member.has_provider_management_role()
                        || Some(member.org_id) == parties.provider_org_id
                }
                _ => false,
            };
            if eligible {
                pool.push(member);
            }
        }

        let active: HashSet<Uuid> = store::active_participants(&mut *conn, conversation.id)
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .collect();

        let mut seen = HashSet::new();
        pool.retain(|profile| {
            if active.contains(&profile.id) || !seen.insert(profile.id) {
                return false;
            }
            match conversation.kind {
                ConversationKind::External => !profile.has_forbidden_external_role(),
                ConversationKind::Internal => profile.org_kind == OrgKind::Provider,
                _ => true,
            }
        });
        pool.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        Ok(pool)
    }
}

/// Map a policy denial to the error taxonomy.
fn deny_to_error(decision: Decision) -> CoreResult<()> {
    match decision {
        Decision::Allow | Decision::AllowWithEscalation => Ok(()),
        Decision::Deny(DenyReason::RoleForbiddenInExternalChat) => Err(CoreError::constraint(
            codes::ROLE_FORBIDDEN_IN_EXTERNAL_CHAT,
            "this role cannot join an external conversation",
        )),
        Decision::Deny(DenyReason::NotProviderOrg) => Err(CoreError::forbidden(
            "internal conversations are provider-only",
        )),
        Decision::Deny(DenyReason::NoCaseStanding) => {
            Err(CoreError::forbidden("no standing on this case"))
        }
    }
}
