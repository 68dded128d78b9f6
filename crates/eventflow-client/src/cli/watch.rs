use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use crossterm::execute;
use crossterm::terminal::SetTitle;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use eventflow_core::api::ApiClient;
use eventflow_core::gateway::{GatewayClient, GatewayEvent};
use eventflow_core::unread::{
    ActiveView, BadgeView, UnreadBadgeManager, UnreadCountSource, UnreadSyncService, WindowTitle,
};
use eventflow_core::{CoreConfig, EventBus};

/// Terminal title sink backed by the crossterm escape sequence.
struct TerminalTitle;

impl WindowTitle for TerminalTitle {
    fn set_title(&mut self, title: &str) {
        let _ = execute!(io::stdout(), SetTitle(title));
        let _ = io::stdout().flush();
    }
}

/// Follow unread counts and live gateway events until ctrl-c.
pub async fn run(config: CoreConfig) -> Result<()> {
    let api = ApiClient::new(&config)?;
    let (gateway, handle) =
        GatewayClient::new(config.gateway_url.clone(), config.user_id.clone());
    tokio::spawn(gateway.run());

    let mut manager = UnreadBadgeManager::new();
    manager.register(
        "terminal",
        Box::new(|view: &BadgeView| println!("{}", view.label)),
    );
    manager.set_title_sink(Box::new(TerminalTitle), "EventFlow");
    // Watch mode fronts the inbox, so the title carries the count prefix.
    manager.set_active_view(ActiveView::Inbox);

    let bus = EventBus::new();
    let service = UnreadSyncService::new(
        manager,
        Arc::new(api) as Arc<dyn UnreadCountSource>,
        handle.clone(),
        bus,
        config.poll_interval,
    );
    tokio::spawn(service.run());

    let mut events = handle.subscribe();
    info!(user_id = %config.user_id, "watching; press ctrl-c to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("stopped");
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(GatewayEvent::MessageNew { message }) => {
                    println!(
                        "[{}] {}: {}",
                        message.conversation_id,
                        message.from_user_id,
                        message.preview()
                    );
                }
                Ok(GatewayEvent::ConversationNew { conversation }) => {
                    println!("new {} conversation {}", conversation.kind.as_str(), conversation.id);
                }
                Ok(GatewayEvent::TicketUpdate { ticket }) => {
                    println!("ticket {} is now {}", ticket.id, ticket.status.as_str());
                }
                Ok(GatewayEvent::Typing { conversation_id, user_id, started }) => {
                    if started {
                        println!("{user_id} is typing in {conversation_id}");
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}
