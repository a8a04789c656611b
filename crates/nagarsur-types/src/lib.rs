pub mod api;
pub mod events;
pub mod models;
pub mod path;
pub mod ports;
pub mod push;

pub use events::{ChangeEvent, IdentityRecord, PlatformEvent};
pub use path::{DbPath, PathError};
pub use ports::{DirectoryStore, IdentityError, IdentityProvider, PushError, PushGateway, StoreError};
pub use push::{PushPayload, PushResponse};
