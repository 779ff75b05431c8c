mod resolver;
mod upstream;

pub use resolver::{handle_request, resolve_photo_url};
pub use upstream::{DEFAULT_PROFILE_API, ProfileLookup, XProfileClient};
