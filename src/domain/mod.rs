pub mod page;
pub mod payload;
pub mod report;
pub mod ticket;
