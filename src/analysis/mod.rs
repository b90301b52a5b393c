//! Analysis and result aggregation modules
//!
//! Combines feature extraction results into final analysis:
//! - Confidence scoring
//! - Result and JSON report types

pub mod confidence;
pub mod result;
