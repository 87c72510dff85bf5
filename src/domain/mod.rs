//! Domain entities and pure business rules.
//!
//! Everything in this module is side-effect free. Storage access goes
//! through the ports defined in [`ports`]; the engines in the application
//! layer wire the two together.

pub mod invoice;
pub mod lease;
pub mod matching;
pub mod payment;
pub mod ports;
pub mod tenant;
