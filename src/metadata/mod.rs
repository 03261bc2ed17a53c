pub mod fetchers;
pub mod normalize;
pub mod providers;
pub mod resolver;
pub mod types;

pub use providers::ProviderRegistry;
pub use resolver::Resolver;
pub use types::{MetaOptions, MetadataOverride, ResolvedMetadata, SourceKind};
