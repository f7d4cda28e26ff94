pub mod auth;
pub mod bookings;
pub mod cart;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod payments;
pub mod providers;
pub mod retry;
pub mod seeds;
pub mod store;
pub mod telemetry;
pub mod tours;
