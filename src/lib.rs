//! mensa-menus: weekly Mensa menus with an offline cache, in a Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
