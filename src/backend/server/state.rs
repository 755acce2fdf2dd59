/**
 * Application State Management
 *
 * `AppState` is the central state container handed to every handler. It
 * owns the database pool, the collaborator seams (directory, notifier,
 * mailer live inside the services that use them), and the three domain
 * services built on top of the shared membership engine.
 *
 * # Thread Safety
 *
 * Everything here is cheap to clone: the pool is an `Arc` internally, the
 * collaborators are `Arc<dyn Trait>`, and the services hold only clones of
 * those.
 *
 * # State Extraction
 *
 * The `FromRef` implementation lets handlers that only need the pool
 * (the health probe) extract just that, following Axum's pattern.
 */

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::backend::cases::{ProcurementService, TicketService};
use crate::backend::chat::ChatService;
use crate::backend::directory::Directory;
use crate::backend::mail::ProposalMailer;
use crate::backend::membership::MembershipEngine;
use crate::backend::notify::Notifier;

/// Application state shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,

    /// Identity and organization lookups
    pub directory: Arc<dyn Directory>,

    /// Case-conversation membership policy
    pub membership: MembershipEngine,

    /// Conversation operations
    pub chat: ChatService,

    /// Ticket workflow
    pub tickets: TicketService,

    /// Procurement workflow
    pub procurements: ProcurementService,
}

impl AppState {
    /// Wire the services from the pool and the collaborator seams.
    pub fn new(
        pool: PgPool,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
        mailer: Arc<dyn ProposalMailer>,
    ) -> Self {
        let membership = MembershipEngine::new(directory.clone());
        let chat = ChatService::new(pool.clone(), membership.clone());
        let tickets = TicketService::new(pool.clone(), membership.clone(), notifier.clone());
        let procurements =
            ProcurementService::new(pool.clone(), membership.clone(), notifier, mailer);

        Self {
            pool,
            directory,
            membership,
            chat,
            tickets,
            procurements,
        }
    }
}

/// Extract the pool directly from `AppState`
impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.pool.clone()
    }
}
