//! Configuration module

mod site;

pub use site::HighlightConfig;
pub use site::PostOrder;
pub use site::SiteConfig;
