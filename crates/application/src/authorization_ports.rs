mod clock;
mod metadata;
mod snapshot;

pub use clock::{Clock, SystemClock};
pub use metadata::{ResourceMetadataProvider, ResourceOwnership};
pub use snapshot::AuthorizationRepository;
