pub mod assignment;
pub mod driver_profile;
pub mod trip;
pub mod user;
