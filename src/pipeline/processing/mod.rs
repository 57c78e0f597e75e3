// Record processing: normalization, field derivation, multi-value expansion, aggregation

pub mod aggregate;
pub mod enrich;
pub mod expand;
pub mod normalize;
