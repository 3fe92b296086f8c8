pub mod identifier;
pub mod mapper;
pub mod tabular;
