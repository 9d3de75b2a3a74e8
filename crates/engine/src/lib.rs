pub mod eodhd;
pub mod guard;
pub mod scheduler;
pub mod service;
pub mod session;

pub use eodhd::EodhdClient;
pub use guard::{GuardDecision, LiveGuard};
pub use scheduler::Scheduler;
pub use service::SignalService;
pub use session::{Session, SessionConfig};
