mod http;
mod publisher;
mod responder;

pub use http::{HttpInteractionResponder, PlatformClient};
pub use publisher::{CommandPublisher, HttpCommandPublisher, PublishError};
pub use responder::{
    AckError, InteractionResponder, ModalField, ModalSpec, ReplyMessage, ResponderFactory,
    TextInputStyle,
};
