pub mod panel;
pub mod power;
pub mod solar;
pub mod weather;
