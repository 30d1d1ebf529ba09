// sgivu-api: Async REST transport for sgivu resource collections

pub mod error;
pub mod page;
pub mod resource;
pub mod transport;

pub use error::Error;
pub use page::Page;
pub use resource::{ResourceClient, format_number, search_params};
pub use transport::{TlsMode, TransportConfig};
