//! Caption engine: model calls, response repair, viewer fan-out and the
//! async driver that executes queue effects.
mod controller;
mod generate;
mod hub;
mod media;
mod prompt;
mod protocol;
mod repair;

pub use controller::{ControllerHandle, ItemFailure, QueueController};
pub use generate::{CaptionGenerator, ChatCompletionsGenerator, GenerationFailure, ModelSettings};
pub use hub::{BroadcastHub, ChannelSink, SessionId, TransportFault, ViewerSink};
pub use media::{file_name_of, mime_type_for, FsImageSource, ImageSource, MemoryImageSource};
pub use prompt::{
    build_chat_request, image_data_url, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_PROMPT,
};
pub use protocol::{parse_viewer_message, ProtocolError, ViewerEvent};
pub use repair::{repair_json, strip_code_fences, ParseFailure, ResponseRepairer, TolerantJsonRepairer};
