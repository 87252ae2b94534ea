pub mod badge_resolver;
pub mod badge_service;
pub mod bubble_service;
pub mod catalog_service;
pub mod composer;
pub mod debug_banner;
pub mod demo_service;
pub mod diagnostic_logger;
pub mod emote_ranges;
pub mod emote_service;
pub mod irc_parser;
pub mod irc_service;
pub mod overlay_server;
pub mod token_matcher;
pub mod twitch_service;
