//! Chain connectors.
//!
//! The swap logic only ever talks to the two chains through the traits in
//! these modules, which keeps the protocol code independent of any concrete
//! backend and lets the test suite substitute in-memory fakes.

pub mod bitcoin;
pub mod bitshares;
