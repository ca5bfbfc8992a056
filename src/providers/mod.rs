mod newsletter2go;
mod provider;

pub use newsletter2go::{GRANT_MAPPINGS, Newsletter2GoProvider};
pub use provider::OAuthProvider;
