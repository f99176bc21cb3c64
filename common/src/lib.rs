pub mod activity;
pub mod address;
pub mod chain;
pub mod currency;
pub mod flow;
pub mod payment;
pub mod resolver;
pub mod routing;
pub mod services;
pub mod token;
pub mod transaction;
