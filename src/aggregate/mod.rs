pub mod composite;

pub use composite::{
    Aggregator, Composite, MissingMemberPolicy, AGGREGATION_FLOOR, AGGREGATION_SCALE,
    COMBINATION_UNIT, COMPOSITE_DELIMITER, COMPOSITE_NONCE, SYNERGY_UNIT,
};
