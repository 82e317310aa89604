pub mod observer;
pub mod publisher;
pub mod rule;

pub use observer::{LogObserver, Observer, ObserverRegistry, ObserverToken};
pub use publisher::{Publisher, PublisherStats};
pub use rule::{AlertPolicy, AlertRule, AlertingWindow, Decision, RuleState, SuppressReason};
