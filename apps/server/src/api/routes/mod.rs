//! Route tables for each API surface

pub mod fhir;
pub mod problem_list;
pub mod system;
pub mod terminology;
