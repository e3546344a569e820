pub mod auth;
pub mod lro;
pub mod metadata;
pub mod mock;
pub mod types;

pub use auth::{StaticTokenIssuer, TokenIssuer, TokenScope};
pub use lro::{HttpLroClient, LroClient, report_control_result};
pub use metadata::{ContentEdit, HttpMetadataGateway, MetadataGateway, read_typed};
pub use mock::{MockCalls, MockFabric};
pub use types::*;
