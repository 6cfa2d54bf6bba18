//! Session lifecycle: records, persistence, refresh serialization and the
//! controller that ties them together.

mod controller;
mod flight;
mod record;
mod store;

pub use controller::{SessionController, SessionPolicy, SessionRead};
pub use flight::{FlightGuard, SingleFlight};
pub use record::{SessionId, SessionRecord, SessionView};
pub use store::{InMemorySessionStore, SessionStore, StoredSession};
