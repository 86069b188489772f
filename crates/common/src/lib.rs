pub mod auth;
pub mod contact;
pub mod rpc_error;
pub mod template_types;
pub mod tenant;

pub use auth::*;
pub use contact::*;
pub use rpc_error::*;
pub use template_types::*;
pub use tenant::*;
