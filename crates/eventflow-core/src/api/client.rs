//! HTTP client for the conversation store's REST API.

use base64::Engine;
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::composer::StagedAttachment;
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::models::{Contact, Conversation, Message, SupportTicket, TicketFilters};

use super::types::*;

/// Thin, connection-pooled wrapper over the REST endpoints. One instance is
/// shared by every component; cloning is cheap.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &CoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base: config.api_base.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map non-success statuses onto the error taxonomy. The body text is
    /// carried into Api errors so operators see what the server said.
    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CoreError::Unauthorized);
        }
        let message = response.text().await.unwrap_or_default();
        Err(CoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Fetch the authoritative aggregate unread count.
    pub async fn fetch_unread_count(&self) -> Result<i64> {
        let response = self
            .authorize(self.http.get(self.url("/api/me/messages/unread")))
            .send()
            .await?;
        let body: UnreadCountResponse = self.check(response).await?.json().await?;
        debug!(count = body.count, "fetched unread count");
        Ok(body.count)
    }

    /// Search the contact directory. An empty query returns the unfiltered
    /// initial listing.
    pub async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>> {
        let mut request = self.http.get(self.url("/api/contacts"));
        if !query.is_empty() {
            request = request.query(&[("q", query)]);
        }
        let response = self.authorize(request).send().await?;
        let body: ContactsResponse = self.check(response).await?.json().await?;
        Ok(body.contacts)
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let response = self
            .authorize(self.http.get(self.url("/api/me/conversations")))
            .send()
            .await?;
        let body: ConversationsResponse = self.check(response).await?.json().await?;
        Ok(body.conversations)
    }

    /// Create a conversation, or receive the existing one when the store
    /// already has a thread for this direct pair.
    pub async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> Result<Conversation> {
        let response = self
            .authorize(self.http.post(self.url("/api/conversations")).json(request))
            .send()
            .await?;
        let body: ConversationResponse = self.check(response).await?.json().await?;
        Ok(body.conversation)
    }

    /// Deliver a message with its staged attachments.
    pub async fn post_message(
        &self,
        conversation_id: &str,
        content: &str,
        attachments: &[StagedAttachment],
    ) -> Result<Message> {
        let engine = base64::engine::general_purpose::STANDARD;
        let request = SendMessageRequest {
            content: content.to_string(),
            attachments: attachments
                .iter()
                .map(|a| AttachmentUpload {
                    file_name: a.file_name.clone(),
                    mime_type: a.mime_type.clone(),
                    size: a.data.len() as u64,
                    checksum: a.checksum.clone(),
                    data: engine.encode(&a.data),
                })
                .collect(),
        };
        let path = format!("/api/conversations/{conversation_id}/messages");
        let response = self
            .authorize(self.http.post(self.url(&path)).json(&request))
            .send()
            .await?;
        let body: MessageResponse = self.check(response).await?.json().await?;
        Ok(body.message)
    }

    /// Mark every message in a conversation read. Returns the new aggregate
    /// unread count so the caller can publish it without a second fetch.
    pub async fn mark_conversation_read(&self, conversation_id: &str) -> Result<i64> {
        let path = format!("/api/conversations/{conversation_id}/read");
        let response = self
            .authorize(self.http.post(self.url(&path)))
            .send()
            .await?;
        let body: MarkReadResponse = self.check(response).await?.json().await?;
        Ok(body.count)
    }

    pub async fn edit_message(&self, message_id: &str, content: &str) -> Result<Message> {
        let request = EditMessageRequest {
            content: content.to_string(),
        };
        let path = format!("/api/messages/{message_id}");
        let response = self
            .authorize(self.http.put(self.url(&path)).json(&request))
            .send()
            .await?;
        let body: MessageResponse = self.check(response).await?.json().await?;
        Ok(body.message)
    }

    /// Soft-delete a message. The store keeps a tombstone and returns it.
    pub async fn delete_message(&self, message_id: &str) -> Result<Message> {
        let path = format!("/api/messages/{message_id}");
        let response = self
            .authorize(self.http.delete(self.url(&path)))
            .send()
            .await?;
        let body: MessageResponse = self.check(response).await?.json().await?;
        Ok(body.message)
    }

    pub async fn list_tickets(&self, filters: &TicketFilters) -> Result<Vec<SupportTicket>> {
        let mut request = self.http.get(self.url("/api/admin/tickets"));
        let query = filters.to_query();
        if !query.is_empty() {
            request = request.query(&query);
        }
        let response = self.authorize(request).send().await?;
        let body: TicketsResponse = self.check(response).await?.json().await?;
        Ok(body.tickets)
    }

    /// Append an admin reply to a ticket's conversation. The store applies
    /// any follow-on status transition and returns the updated ticket.
    pub async fn reply_ticket(&self, ticket_id: &str, message: &str) -> Result<SupportTicket> {
        let request = TicketReplyRequest {
            message: message.to_string(),
        };
        let path = format!("/api/admin/tickets/{ticket_id}/reply");
        let response = self
            .authorize(self.http.post(self.url(&path)).json(&request))
            .send()
            .await?;
        let body: TicketResponse = self.check(response).await?.json().await?;
        Ok(body.ticket)
    }

    pub async fn update_ticket(
        &self,
        ticket_id: &str,
        update: &TicketUpdateRequest,
    ) -> Result<SupportTicket> {
        let path = format!("/api/admin/tickets/{ticket_id}");
        let response = self
            .authorize(self.http.put(self.url(&path)).json(update))
            .send()
            .await?;
        let body: TicketResponse = self.check(response).await?.json().await?;
        Ok(body.ticket)
    }
}
