//! Turning a user supplied computation into a definition the service accepts.

mod builder;
mod validate;

pub use self::builder::DefinitionBuilder;
pub(crate) use self::validate::validate_definition;
