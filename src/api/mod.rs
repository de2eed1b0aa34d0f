pub mod auth;
pub mod geocode;
pub mod incidents;
pub mod oauth;
pub mod profile;
