pub mod fetcher;
pub mod record;
pub mod store;

pub use fetcher::{FetchGate, FetchWindow, FetchedWaveform, WaveformFetcher};
pub use record::{ArrivalRecord, ChannelWindow, WaveformSegment};
pub use store::{MemoryStore, StoredTrace, WaveformStore};
