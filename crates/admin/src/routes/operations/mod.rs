//! Operations console: kitchen queue, batches, dispatch and inventory.
//!
//! Every handler here takes [`RequireStaff`](crate::middleware::RequireStaff),
//! so both admins and operations staff can use them.

pub mod batches;
pub mod deliveries;
pub mod events;
pub mod inventory;
pub mod production;
