//! Small helpers shared by the negotiation and security layers.

pub mod byte_order;

pub use byte_order::{int_to_network_byte_order, network_byte_order_to_int};
