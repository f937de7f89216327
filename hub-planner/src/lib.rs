//! Transit hub graph builder and journey-time planner.
//!
//! Builds a weighted, hub-consolidated graph from a transit network's line,
//! timetable and journey data, then answers "how long from A to B" and
//! "where should this group meet" queries over it.

pub mod domain;
pub mod graph;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod resolve;
pub mod source;
pub mod stations;
pub mod web;
