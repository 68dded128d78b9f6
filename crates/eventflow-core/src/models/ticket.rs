use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a support ticket.
///
/// The workflow allows re-opening from any settled state, but every
/// transition out of `Closed` must be an explicit re-open; there is no
/// side-effect path back to an active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(TicketStatus::Open),
            "in_progress" => Some(TicketStatus::InProgress),
            "resolved" => Some(TicketStatus::Resolved),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    /// Whether an explicit status change from `self` to `to` is allowed.
    pub fn can_transition(self, to: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, to),
            (Open, InProgress)
                | (Open, Resolved)
                | (Open, Closed)
                | (InProgress, Resolved)
                | (InProgress, Closed)
                | (Resolved, Closed)
                | (Resolved, Open)
                | (Closed, Open)
        )
    }

    /// Status after an admin reply. A first reply moves a fresh ticket into
    /// `InProgress`; replies never re-open settled tickets.
    pub fn on_admin_reply(self) -> TicketStatus {
        match self {
            TicketStatus::Open => TicketStatus::InProgress,
            other => other,
        }
    }
}

/// Triage priority, ordered lowest to highest so tickets can be sorted
/// urgent-first. Priority is set independently of status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TicketPriority::Low),
            "medium" => Some(TicketPriority::Medium),
            "high" => Some(TicketPriority::High),
            "urgent" => Some(TicketPriority::Urgent),
            _ => None,
        }
    }
}

/// A customer support ticket. Each ticket fronts a `support` conversation;
/// replies land in that thread while status, priority and assignment live
/// here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: String,
    /// Backing support conversation
    pub conversation_id: String,
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    /// Admin user id, or None while unassigned
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Excerpt of the most recent message, for list rendering and search
    #[serde(default)]
    pub last_message_excerpt: String,
}

impl SupportTicket {
    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }
}

/// Assignment side of the ticket filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentFilter {
    Assigned,
    Unassigned,
}

/// Composable ticket list filter. Absent fields constrain nothing; present
/// fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct TicketFilters {
    /// Free-text terms matched against subject, sender and excerpt
    pub text: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assignment: Option<AssignmentFilter>,
}

impl TicketFilters {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignment.is_none()
    }

    /// Evaluate the filter against one ticket.
    pub fn matches(&self, ticket: &SupportTicket) -> bool {
        if let Some(status) = self.status {
            if ticket.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if ticket.priority != priority {
                return false;
            }
        }
        if let Some(assignment) = self.assignment {
            let wants_assigned = assignment == AssignmentFilter::Assigned;
            if ticket.is_assigned() != wants_assigned {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if !text_matches(text, ticket) {
                return false;
            }
        }
        true
    }

    /// Query-string form for the list endpoint. Key order matches field
    /// order so request logs stay comparable.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(text) = &self.text {
            query.push(("q", text.clone()));
        }
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            query.push(("priority", priority.as_str().to_string()));
        }
        if let Some(assignment) = self.assignment {
            let value = match assignment {
                AssignmentFilter::Assigned => "assigned",
                AssignmentFilter::Unassigned => "unassigned",
            };
            query.push(("assignment", value.to_string()));
        }
        query
    }
}

/// Every whitespace-separated term must appear (case-insensitive) in at
/// least one searchable field.
fn text_matches(text: &str, ticket: &SupportTicket) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        ticket.subject, ticket.sender_name, ticket.sender_email, ticket.last_message_excerpt
    )
    .to_lowercase();
    text.split_whitespace()
        .all(|term| haystack.contains(&term.to_lowercase()))
}

/// Sort urgent-first, then newest-first within the same priority.
pub fn sort_for_triage(tickets: &mut [SupportTicket]) {
    tickets.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ticket(id: &str, status: TicketStatus, priority: TicketPriority) -> SupportTicket {
        SupportTicket {
            id: id.to_string(),
            conversation_id: format!("conv-{id}"),
            subject: "Refund for cancelled booking".to_string(),
            sender_name: "Priya Shah".to_string(),
            sender_email: "priya@example.com".to_string(),
            status,
            priority,
            assigned_to: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            last_message_excerpt: "The supplier cancelled two days before".to_string(),
        }
    }

    #[test]
    fn test_allowed_transitions() {
        use TicketStatus::*;
        assert!(Open.can_transition(InProgress));
        assert!(Open.can_transition(Resolved));
        assert!(Open.can_transition(Closed));
        assert!(InProgress.can_transition(Resolved));
        assert!(InProgress.can_transition(Closed));
        assert!(Resolved.can_transition(Closed));
        assert!(Resolved.can_transition(Open));
        assert!(Closed.can_transition(Open));
    }

    #[test]
    fn test_forbidden_transitions() {
        use TicketStatus::*;
        assert!(!InProgress.can_transition(Open));
        assert!(!Resolved.can_transition(InProgress));
        assert!(!Closed.can_transition(InProgress));
        assert!(!Closed.can_transition(Resolved));
        assert!(!Open.can_transition(Open));
    }

    #[test]
    fn test_admin_reply_only_advances_open() {
        assert_eq!(TicketStatus::Open.on_admin_reply(), TicketStatus::InProgress);
        assert_eq!(
            TicketStatus::InProgress.on_admin_reply(),
            TicketStatus::InProgress
        );
        assert_eq!(TicketStatus::Resolved.on_admin_reply(), TicketStatus::Resolved);
        assert_eq!(TicketStatus::Closed.on_admin_reply(), TicketStatus::Closed);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filters = TicketFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches(&ticket("t1", TicketStatus::Open, TicketPriority::Low)));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let mut t = ticket("t1", TicketStatus::Open, TicketPriority::High);
        t.assigned_to = Some("admin-1".to_string());

        let filters = TicketFilters {
            text: Some("refund".to_string()),
            status: Some(TicketStatus::Open),
            priority: Some(TicketPriority::High),
            assignment: Some(AssignmentFilter::Assigned),
        };
        assert!(filters.matches(&t));

        let wrong_priority = TicketFilters {
            priority: Some(TicketPriority::Urgent),
            ..filters.clone()
        };
        assert!(!wrong_priority.matches(&t));
    }

    #[test]
    fn test_text_filter_requires_all_terms() {
        let t = ticket("t1", TicketStatus::Open, TicketPriority::Low);
        let both = TicketFilters {
            text: Some("refund priya".to_string()),
            ..Default::default()
        };
        assert!(both.matches(&t));

        let missing = TicketFilters {
            text: Some("refund chargeback".to_string()),
            ..Default::default()
        };
        assert!(!missing.matches(&t));
    }

    #[test]
    fn test_text_filter_is_case_insensitive() {
        let t = ticket("t1", TicketStatus::Open, TicketPriority::Low);
        let filters = TicketFilters {
            text: Some("REFUND".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&t));
    }

    #[test]
    fn test_unassigned_filter() {
        let t = ticket("t1", TicketStatus::Open, TicketPriority::Low);
        let filters = TicketFilters {
            assignment: Some(AssignmentFilter::Unassigned),
            ..Default::default()
        };
        assert!(filters.matches(&t));

        let mut assigned = t.clone();
        assigned.assigned_to = Some("admin-1".to_string());
        assert!(!filters.matches(&assigned));
    }

    #[test]
    fn test_triage_sort_orders_urgent_first_then_newest() {
        let mut low = ticket("low", TicketStatus::Open, TicketPriority::Low);
        low.updated_at = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let mut urgent_old = ticket("urgent-old", TicketStatus::Open, TicketPriority::Urgent);
        urgent_old.updated_at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut urgent_new = ticket("urgent-new", TicketStatus::Closed, TicketPriority::Urgent);
        urgent_new.updated_at = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();

        let mut tickets = vec![low, urgent_old, urgent_new];
        sort_for_triage(&mut tickets);

        let ids: Vec<&str> = tickets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["urgent-new", "urgent-old", "low"]);
    }

    #[test]
    fn test_status_wire_strings() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(TicketStatus::from_str("in_progress"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::from_str("reopened"), None);
    }
}
