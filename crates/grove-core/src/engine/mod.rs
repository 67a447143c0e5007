//! Conversation analysis engines.

pub mod entropy;

pub use entropy::{
    EntropyClass, EntropyResult, EntropyState, TopicHub, calculate_entropy, dismiss_entropy,
    journey_for_cluster, should_inject, update_entropy_state,
};
