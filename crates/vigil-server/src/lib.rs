pub mod app;
pub mod monitor;
pub mod scheduler;

pub use app::App;
pub use monitor::{HttpMonitor, Monitor, MonitorSet, TargetRegistration, TcpMonitor};
pub use scheduler::{spawn_publisher_worker, MonitorScheduler};
