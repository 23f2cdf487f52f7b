pub mod cached_provider;
pub mod token;

pub use cached_provider::CachedTokenProvider;
pub use token::AccessToken;
