pub mod analysis;
pub mod http;
pub mod publisher;
pub mod strategy;

pub use analysis::AnalysisService;
pub use http::{HttpGateway, TextResponse};
pub use publisher::{ChangeNotifier, PublisherService};
pub use strategy::ExtractionStrategy;
