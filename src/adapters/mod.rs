//! Player backends implementing the bridge capabilities

pub mod mopidy;

pub use mopidy::MopidyAdapter;
