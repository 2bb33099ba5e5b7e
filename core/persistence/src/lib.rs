#[macro_use]
extern crate diesel;

pub mod executor;
