//! Tool adapters: one per external capability the agent can call, plus the registry
//! that maps tool names to them.

pub mod adapter;
pub mod booking;
pub mod budget;
pub mod configs;
pub mod directions;
pub mod http;
pub mod images;
pub mod news;
pub mod places;
pub mod registry;
pub mod schema;
pub mod sos;
pub mod weather;

pub use adapter::Adapter;
pub use configs::ToolsConfig;
pub use registry::ToolRegistry;
