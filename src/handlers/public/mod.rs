// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service metadata and liveness. Mounted outside /api/v1 so probes and
// load balancers never need a token.

pub mod system;

pub use system::{health, root};
