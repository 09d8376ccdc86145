// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT auth, /api/v1/*)
pub mod public;    // GET / and GET /health
pub mod protected; // Menu, role and user-assignment operations
