pub mod bubble;
pub mod chat_message;
pub mod lookup;
pub mod settings;
