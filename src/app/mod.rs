pub mod ports;
pub mod query_use_case;
