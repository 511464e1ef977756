pub mod telegram;

pub use telegram::{SendDocumentRequest, SendDocumentResponse, TelegramClient, TelegramError};
