//! Relayer event log entries

use serde::{Deserialize, Serialize};

use crate::order::OrderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RelayerEvent {
    /// `action` is 1 for provision, 2 for removal
    NewOrder { order_id: OrderId, action: u8 },
    ExecutedOrder { order_id: OrderId },
    WithdrawnExpiredOrder { order_id: OrderId },
}
