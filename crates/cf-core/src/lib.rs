pub mod case_map;
pub mod error;
pub mod types;

pub use case_map::CaseMap;
pub use error::CfmlError;
pub use types::*;
