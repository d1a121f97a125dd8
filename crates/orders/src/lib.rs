//! Orders domain module.
//!
//! The `Order` aggregate owns its `OrderItem`s and moves through the status
//! lifecycle in [`status`]. Inventory side effects are returned as values
//! (`StockRelease`) for the caller to apply in the same unit of work.

pub mod item;
pub mod order;
pub mod status;

pub use item::{OrderItem, OrderLine};
pub use order::{Order, OrderRecord, ReleaseLine, StockRelease};
pub use status::OrderStatus;
