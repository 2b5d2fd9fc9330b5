pub mod http_client;

pub mod navigator;

pub mod request;

pub(crate) mod response;
