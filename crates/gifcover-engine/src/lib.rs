pub mod autofill;
pub mod config;
pub mod dispatch;
pub mod gallery;
pub mod host;
pub mod plugin_log;

mod http;

pub use autofill::{AutofillSummary, TagAutofill};
pub use config::EngineConfig;
pub use dispatch::Dispatcher;
pub use gallery::{GalleryFetcher, GallerySource, RemoteGallerySource};
pub use host::{GraphqlTransport, HostClient, HttpGraphqlTransport};
