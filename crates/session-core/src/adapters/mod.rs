// Adapters for the engine's external collaborators
pub mod media;
pub mod signaling;
pub mod transport;

// Re-export adapters
pub use media::{MediaPipeline, NullMediaPipeline};
pub use signaling::{OutboundMessage, SignalingTransport};
pub use transport::{PortRangeTransport, TransportProvider};
