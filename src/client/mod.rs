//! Recording client: captures pointer motion, runs the session protocol
//! against the server and reports results to the UI through channels.

pub mod api;
pub mod capture;
pub mod connection;
pub mod driver;
pub mod recenter;
pub mod session;

pub use api::{ApiClient, SettingsSource, StaticSettings};
pub use capture::PointCapture;
pub use connection::{Connection, ConnectionEvent};
pub use driver::{InputEvent, SessionDriver, SessionUpdate};
pub use recenter::{JitterFilter, RecenterCoordinator};
pub use session::{transition, Effect, SessionContext, SessionEvent, SessionState, SessionStatus};
