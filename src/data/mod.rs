pub mod aesthetics;
pub mod entity;
pub mod query;
pub mod selection;
