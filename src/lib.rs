//! Works out where the Sun is in its day/night cycle at the user's location and picks a piece of ASCII
//! art to match.
//!
//! The location comes from the command line, the config file, a cached earlier lookup or a geocoding web
//! service. Sunrise and sunset are fetched from a web service; [`calc`] turns them and the current time
//! into an angle around the cycle, which [`art`] maps onto one of sixteen pictures.

pub mod api;
pub mod art;
pub mod cache;
pub mod calc;
pub mod cli;
pub mod clock;
pub mod domain;
pub mod errors;
pub mod report;
pub mod subcommands;
pub mod utils;
