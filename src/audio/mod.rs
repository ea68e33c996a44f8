// Audio module - decoding uploads into analysable mono signals

pub mod loader;
pub mod signal;

// Re-export commonly used types for convenience
pub use loader::SignalLoader;
pub use signal::AudioSignal;
