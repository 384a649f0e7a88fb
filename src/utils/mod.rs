pub mod fare;
pub mod geo;
pub mod jwt;
