//! Support ticket administration.
//!
//! Admin-side operations over the ticket store: triage listing, replies
//! into the backing conversation, and status/priority/assignment changes.
//! Transition rules are enforced locally before anything reaches the wire,
//! so an illegal change never even becomes a request.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{ApiClient, TicketUpdateRequest};
use crate::error::{CoreError, Result};
use crate::events::{CoreEvent, EventBus};
use crate::models::{sort_for_triage, SupportTicket, TicketFilters, TicketPriority, TicketStatus};

/// Persistence operations the desk needs. The REST client is the
/// production implementation; tests supply in-memory fakes.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn list_tickets(&self, filters: &TicketFilters) -> Result<Vec<SupportTicket>>;
    /// Append an admin reply. The store applies any follow-on status
    /// transition and returns the updated ticket.
    async fn reply_ticket(&self, ticket_id: &str, message: &str) -> Result<SupportTicket>;
    async fn update_ticket(
        &self,
        ticket_id: &str,
        update: &TicketUpdateRequest,
    ) -> Result<SupportTicket>;
}

#[async_trait]
impl TicketStore for ApiClient {
    async fn list_tickets(&self, filters: &TicketFilters) -> Result<Vec<SupportTicket>> {
        ApiClient::list_tickets(self, filters).await
    }

    async fn reply_ticket(&self, ticket_id: &str, message: &str) -> Result<SupportTicket> {
        ApiClient::reply_ticket(self, ticket_id, message).await
    }

    async fn update_ticket(
        &self,
        ticket_id: &str,
        update: &TicketUpdateRequest,
    ) -> Result<SupportTicket> {
        ApiClient::update_ticket(self, ticket_id, update).await
    }
}

pub struct TicketDesk {
    store: Arc<dyn TicketStore>,
    bus: EventBus,
}

impl TicketDesk {
    pub fn new(store: Arc<dyn TicketStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }

    /// List matching tickets, urgent-first then newest-first.
    pub async fn list(&self, filters: &TicketFilters) -> Result<Vec<SupportTicket>> {
        let mut tickets = self.store.list_tickets(filters).await?;
        sort_for_triage(&mut tickets);
        Ok(tickets)
    }

    /// Reply to the customer in the ticket's conversation. A reply to a
    /// fresh ticket moves it to in-progress; replies never re-open settled
    /// tickets, that takes an explicit status change.
    pub async fn reply(&self, ticket_id: &str, message: &str) -> Result<SupportTicket> {
        let message = message.trim();
        if message.is_empty() {
            return Err(CoreError::Validation("reply cannot be empty".to_string()));
        }
        let ticket = self.store.reply_ticket(ticket_id, message).await?;
        debug!(ticket_id, status = ticket.status.as_str(), "replied to ticket");
        self.bus.publish(CoreEvent::TicketUpdated(ticket.clone()));
        Ok(ticket)
    }

    /// Move a ticket to a new status.
    pub async fn update_status(
        &self,
        ticket: &SupportTicket,
        status: TicketStatus,
    ) -> Result<SupportTicket> {
        if !ticket.status.can_transition(status) {
            return Err(CoreError::Validation(format!(
                "cannot move ticket from {} to {}",
                ticket.status.as_str(),
                status.as_str()
            )));
        }
        let update = TicketUpdateRequest {
            status: Some(status),
            ..Default::default()
        };
        let updated = self.store.update_ticket(&ticket.id, &update).await?;
        self.bus.publish(CoreEvent::TicketUpdated(updated.clone()));
        Ok(updated)
    }

    pub async fn set_priority(
        &self,
        ticket: &SupportTicket,
        priority: TicketPriority,
    ) -> Result<SupportTicket> {
        let update = TicketUpdateRequest {
            priority: Some(priority),
            ..Default::default()
        };
        let updated = self.store.update_ticket(&ticket.id, &update).await?;
        self.bus.publish(CoreEvent::TicketUpdated(updated.clone()));
        Ok(updated)
    }

    /// Assign the ticket to an admin, or clear the assignment with `None`.
    pub async fn assign(
        &self,
        ticket: &SupportTicket,
        admin_id: Option<&str>,
    ) -> Result<SupportTicket> {
        let update = TicketUpdateRequest {
            assigned_to: Some(admin_id.map(String::from)),
            ..Default::default()
        };
        let updated = self.store.update_ticket(&ticket.id, &update).await?;
        self.bus.publish(CoreEvent::TicketUpdated(updated.clone()));
        Ok(updated)
    }
}
