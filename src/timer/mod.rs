//! Timer access: the remote contract, the facade over it and the
//! in-process implementation

pub mod facade;
pub mod local;
pub mod remote;

pub use facade::{TimerEvent, TimerFacade};
pub use local::LocalTimer;
pub use remote::{RemoteError, RemoteProperties, RemoteSignal, RemoteTimer, TimerCommand};
