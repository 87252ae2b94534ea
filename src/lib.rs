//! Live Twitch chat overlay engine.
//!
//! `services::irc_service` feeds chat lines through `services::composer` into a
//! `services::bubble_service::BubbleService`, which presents and retires bubbles on a
//! `RenderSink`. `services::overlay_server` provides the websocket-backed sink.

pub mod models;
pub mod services;
pub mod utils;
