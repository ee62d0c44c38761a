// ── Filter predicates for store snapshots ──
//
// Used by the CLI to narrow snapshots without re-querying the backend.

use crate::model::{Client, ClientStatus, EntityId, Order, Priority, SalesRep, Stage};

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Filter predicate for client collections.
pub enum ClientFilter {
    All,
    ByStatus(ClientStatus),
    /// Hide archived clients.
    Current,
    /// Case-insensitive match on name, legal name or tax id.
    Search(String),
    Custom(Box<dyn Fn(&Client) -> bool + Send + Sync>),
}

impl ClientFilter {
    pub fn matches(&self, client: &Client) -> bool {
        match self {
            Self::All => true,
            Self::ByStatus(status) => client.status == *status,
            Self::Current => !client.is_archived(),
            Self::Search(term) => {
                contains_ci(&client.name, term)
                    || client
                        .legal_name
                        .as_deref()
                        .is_some_and(|n| contains_ci(n, term))
                    || client.tax_id.as_deref().is_some_and(|c| contains_ci(c, term))
            }
            Self::Custom(f) => f(client),
        }
    }
}

/// Filter predicate for sales rep collections.
pub enum SalesRepFilter {
    All,
    Active,
    Inactive,
    Search(String),
}

impl SalesRepFilter {
    pub fn matches(&self, rep: &SalesRep) -> bool {
        match self {
            Self::All => true,
            Self::Active => rep.active,
            Self::Inactive => !rep.active,
            Self::Search(term) => contains_ci(&rep.name, term),
        }
    }
}

/// Filter predicate for order collections.
pub enum OrderFilter {
    All,
    ByStage(Stage),
    ByPriority(Priority),
    ByClient(EntityId),
    /// Not yet completed or archived.
    InProduction,
    /// Case-insensitive match on order number or client name.
    Search(String),
    Custom(Box<dyn Fn(&Order) -> bool + Send + Sync>),
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::ByStage(stage) => order.stage == *stage,
            Self::ByPriority(priority) => order.priority == *priority,
            Self::ByClient(id) => order.client_id.as_ref() == Some(id),
            Self::InProduction => order.stage.is_in_production(),
            Self::Search(term) => {
                contains_ci(&order.order_number, term) || contains_ci(&order.client_name, term)
            }
            Self::Custom(f) => f(order),
        }
    }
}
