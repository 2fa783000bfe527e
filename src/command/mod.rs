//! Flyweights for the commands and responses exchanged with the media driver
//! over the to-driver ring buffer and to-clients broadcast buffer.
pub mod client_timeout;
pub mod correlated_message;
pub mod counter_message;
pub mod counter_update;
pub mod destination_message;
pub mod error_response;
pub mod flyweight;
pub mod image_buffers_ready;
pub mod image_message;
pub mod publication_message;
pub mod publication_ready;
pub mod remove_message;
pub mod subscription_message;
pub mod subscription_ready;
