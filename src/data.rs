pub mod column;
pub mod comparison;
pub mod domain;
pub mod header;
pub mod metrics;
pub mod normalize;
pub mod parse;
pub mod raw;
