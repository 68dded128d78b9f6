use std::sync::Arc;

use anyhow::{Context, Result};

use eventflow_core::api::ApiClient;
use eventflow_core::models::{
    AssignmentFilter, SupportTicket, TicketFilters, TicketPriority, TicketStatus,
};
use eventflow_core::tickets::TicketDesk;
use eventflow_core::{CoreConfig, EventBus};

fn desk(config: &CoreConfig) -> Result<TicketDesk> {
    let api = Arc::new(ApiClient::new(config)?);
    Ok(TicketDesk::new(api, EventBus::new()))
}

fn parse_status(s: &str) -> Result<TicketStatus> {
    TicketStatus::from_str(s)
        .with_context(|| format!("unknown status {s:?}, expected open, in_progress, resolved or closed"))
}

fn parse_priority(s: &str) -> Result<TicketPriority> {
    TicketPriority::from_str(s)
        .with_context(|| format!("unknown priority {s:?}, expected low, medium, high or urgent"))
}

/// The desk has no point lookup, so fetch the unfiltered list and pick
/// the ticket out of it.
async fn find_ticket(desk: &TicketDesk, ticket_id: &str) -> Result<SupportTicket> {
    desk.list(&TicketFilters::default())
        .await?
        .into_iter()
        .find(|t| t.id == ticket_id)
        .with_context(|| format!("no ticket {ticket_id}"))
}

pub async fn list(
    config: CoreConfig,
    query: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    unassigned: bool,
    assigned: bool,
) -> Result<()> {
    let filters = TicketFilters {
        text: query,
        status: status.as_deref().map(parse_status).transpose()?,
        priority: priority.as_deref().map(parse_priority).transpose()?,
        assignment: if unassigned {
            Some(AssignmentFilter::Unassigned)
        } else if assigned {
            Some(AssignmentFilter::Assigned)
        } else {
            None
        },
    };

    let tickets = desk(&config)?.list(&filters).await?;
    if tickets.is_empty() {
        println!("no tickets match");
        return Ok(());
    }
    for ticket in tickets {
        println!(
            "{}  {:<11}  {:<6}  {:<12}  {}",
            ticket.id,
            ticket.status.as_str(),
            ticket.priority.as_str(),
            ticket.assigned_to.as_deref().unwrap_or("-"),
            ticket.subject
        );
    }
    Ok(())
}

pub async fn reply(config: CoreConfig, ticket_id: String, message: String) -> Result<()> {
    let ticket = desk(&config)?.reply(&ticket_id, &message).await?;
    println!("{} is now {}", ticket.id, ticket.status.as_str());
    Ok(())
}

pub async fn set_status(config: CoreConfig, ticket_id: String, status: String) -> Result<()> {
    let target = parse_status(&status)?;
    let desk = desk(&config)?;
    let current = find_ticket(&desk, &ticket_id).await?;
    let before = current.status;
    let updated = desk.update_status(&current, target).await?;
    println!(
        "{}  {} -> {}",
        updated.id,
        before.as_str(),
        updated.status.as_str()
    );
    Ok(())
}

pub async fn set_priority(config: CoreConfig, ticket_id: String, priority: String) -> Result<()> {
    let target = parse_priority(&priority)?;
    let desk = desk(&config)?;
    let current = find_ticket(&desk, &ticket_id).await?;
    let updated = desk.set_priority(&current, target).await?;
    println!("{} priority {}", updated.id, updated.priority.as_str());
    Ok(())
}

pub async fn assign(config: CoreConfig, ticket_id: String, admin: Option<String>) -> Result<()> {
    let desk = desk(&config)?;
    let current = find_ticket(&desk, &ticket_id).await?;
    let updated = desk.assign(&current, admin.as_deref()).await?;
    match updated.assigned_to.as_deref() {
        Some(admin_id) => println!("{} assigned to {}", updated.id, admin_id),
        None => println!("{} unassigned", updated.id),
    }
    Ok(())
}
