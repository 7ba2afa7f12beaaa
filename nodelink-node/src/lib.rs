pub mod attempt;
pub mod config;
pub mod link;
pub mod sensor;
pub mod session;
pub mod transport;

pub use attempt::{
    AttemptId, AttemptState, SendAttempt, SendOutcome, SendReport, Serialized, Submitted,
};
pub use config::{Config, LinkConfig, NodeConfig, PeerConfig, SensorConfig};
pub use link::mock::MockLink;
pub use link::udp::UdpLink;
pub use link::{LinkDriver, LinkError, RawInbound};
pub use sensor::{Sensor, SensorError, SimulatedMpu6050};
pub use session::Session;
pub use transport::{Inbound, Transport};

pub use tokio_util::sync::CancellationToken;
