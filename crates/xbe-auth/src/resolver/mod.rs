//! Token resolution across all sources
//!
//! Single entry point that applies the precedence explicit value >
//! environment > keychain > token file.

mod token_resolver;

pub use crate::secrets::ResolvedToken;
pub use token_resolver::TokenResolver;
