pub mod connection;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod moderation;
pub mod policy;
pub mod registry;
pub mod typing;

pub use coordinator::{RoomCoordinator, RoomHandle};
pub use events::{AdminAction, RoomEvent};
