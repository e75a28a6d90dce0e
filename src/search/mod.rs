mod factory;
mod lastfm;
mod provider;

pub use factory::create_search_provider;
pub use lastfm::{LastFmSearchProvider, LASTFM_API_BASE};
pub use provider::*;
