//! Civic issue reporting backend.
//!
//! Citizens report civic issues (potholes, broken lights, and the
//! like), track their lifecycle, and propose status changes that
//! administrators review; moderators triage abuse flags; a geospatial
//! query finds issues near a point. The crate is organised as a
//! hexagon: `domain` holds entities, ports, and services; `inbound`
//! adapts HTTP onto the driving ports; `outbound` adapts PostgreSQL
//! (and the external token verifier) onto the driven ports.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use doc::ApiDoc;
