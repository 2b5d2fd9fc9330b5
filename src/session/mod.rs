pub mod auth;

pub mod events;

pub mod interface;

pub mod refresh;

pub mod store;
