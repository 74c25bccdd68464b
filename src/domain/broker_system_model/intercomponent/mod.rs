pub mod codec;
pub mod error_translation;
pub mod handlers;
pub mod protocol;
pub mod remote_event_notifier;
pub mod requests;
pub mod tcp;
pub mod transport;
