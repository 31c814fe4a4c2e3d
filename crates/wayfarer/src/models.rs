//! These models represent the objects passed around by the agent
//!
//! There are a few related formats we need to interact with:
//! - chat requests and stored sessions, exchanged with the HTTP front end
//! - openai-compatible messages/tools, sent from the agent to the LLM
//! - adapter requests, sent from the agent to the third-party travel APIs
//!
//! We always immediately convert those data models into the internal structs using
//! to/from helpers, so the internal models are not an exact match to any of these formats.
pub mod contact;
pub mod conversation;
pub mod message;
pub mod role;
pub mod tool;
