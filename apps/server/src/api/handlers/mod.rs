//! Request handlers for API endpoints
//!
//! Handlers extract and validate input, call one service and format the
//! result. Business rules live in `crate::services`.

pub mod fhir;
pub mod params;
pub mod problem_list;
pub mod system;
pub mod terminology;
