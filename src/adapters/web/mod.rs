//! Web service adapter (remote menu source).

pub mod mensa_web;

pub use mensa_web::MensaWebSource;
