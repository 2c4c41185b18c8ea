pub mod entity;
pub mod error;
pub mod port;

pub use entity::{
    AlertInfo, AlertType, BarInfo, BarReplayInfo, ConnectionId, Credentials, EngineParams,
    ReplayRequest,
};
pub use error::EngineError;
pub use port::{AdminCallbacks, EventSink, ReplayEngine, SessionCallbacks};
