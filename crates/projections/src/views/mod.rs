//! Read model views.

pub mod showtime;
