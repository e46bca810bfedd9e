mod client;

pub use openai_assistants_types as types;
pub use client::{AssistantsClient, ByteStream, Client, ClientConfig, ClientConfigBuilder, Stats, connect, connect_with_config};
