//! Weekly class timetabling with a genetic algorithm.
//!
//! A [`data::TimetableInput`] names the days, time slots, rooms, people and
//! teaching loads; [`solver::solve`] evolves a timetable that avoids double
//! bookings and idle gaps. [`server`] hosts the solver over HTTP.

pub mod chromosome;
pub mod context;
pub mod data;
pub mod engine;
pub mod error;
pub mod fitness;
pub mod operators;
pub mod server;
pub mod solver;
pub mod template;
