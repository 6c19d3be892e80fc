//! Wire types exchanged with the LUNA backend.

pub mod attachment;
pub mod chat_summary;
pub mod requests;
pub mod server_id;
pub mod settings;
pub mod stored_message;
pub mod stream_record;
pub mod translated_audio;

pub use attachment::Attachment;
pub use chat_summary::ChatSummary;
pub use requests::{
    ChatRequest, DeleteRequest, EditRequest, PinRequest, RenameRequest, SessionLoginRequest,
    TitleRequest, TitleResponse,
};
pub use server_id::{MessageId, ServerId};
pub use settings::{DEFAULT_PERSONALITY, SaveStatus, Settings};
pub use stored_message::{FileInfo, Role, StoredMessage};
pub use stream_record::StreamRecord;
pub use translated_audio::TranslatedAudio;
