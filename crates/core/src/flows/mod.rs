pub mod classifier;

pub use classifier::{HeuristicStateClassifier, StateClassifier};
