pub mod memory;
pub mod message;
pub mod providers;
pub mod registry;
pub mod render;
pub mod settings;
pub mod transport;

pub use memory::MemoryTransport;
pub use message::{AlertKind, AlertMessage};
pub use providers::{
    validate_http_url, EmailConfig, EmailTransport, InfluxDbConfig, InfluxDbTransport,
    SlackConfig, SlackTransport, TelegramConfig, TelegramTransport,
};
pub use registry::TransportRegistry;
pub use settings::TransportSettings;
pub use transport::{DeliveryResult, Transport};
