//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Transitions:
/// ```text
/// Pending ──► Paid ──► Preparing ──► OutForDelivery ──► Delivered
///    │          │
///    └──────────┴──► Cancelled
/// ```
///
/// Delivered and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order persisted, payment not yet captured.
    #[default]
    Pending,

    /// Payment captured.
    Paid,

    /// Seller is assembling the order.
    Preparing,

    /// Order handed to delivery.
    OutForDelivery,

    /// Order received by the buyer (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if `next` is a legal transition from this status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Cancelled)
                | (Paid, Preparing)
                | (Preparing, OutForDelivery)
                | (OutForDelivery, Delivered)
        )
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its wire name.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "preparing" => Some(OrderStatus::Preparing),
            "out_for_delivery" => Some(OrderStatus::OutForDelivery),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 6] = [Pending, Paid, Preparing, OutForDelivery, Delivered, Cancelled];

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), Pending);
    }

    #[test]
    fn test_exactly_the_permitted_transitions() {
        let permitted = [
            (Pending, Paid),
            (Pending, Cancelled),
            (Paid, Cancelled),
            (Paid, Preparing),
            (Preparing, OutForDelivery),
            (OutForDelivery, Delivered),
        ];

        for from in ALL {
            for to in ALL {
                let expected = permitted.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_no_transition_out_of_terminal_states() {
        for terminal in [Delivered, Cancelled] {
            for to in ALL {
                assert!(!terminal.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_can_cancel_from_pending_and_paid_only() {
        assert!(Pending.can_cancel());
        assert!(Paid.can_cancel());
        assert!(!Preparing.can_cancel());
        assert!(!OutForDelivery.can_cancel());
        assert!(!Delivered.can_cancel());
        assert!(!Cancelled.can_cancel());
    }

    #[test]
    fn test_terminal_states() {
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Paid.is_terminal());
        assert!(!Preparing.is_terminal());
        assert!(!OutForDelivery.is_terminal());
    }

    #[test]
    fn test_parse_roundtrip() {
        for status in ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn test_serialization_uses_wire_names() {
        let json = serde_json::to_string(&OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OutForDelivery);
    }
}
