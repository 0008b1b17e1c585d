pub mod commands;
pub mod messages;
pub mod misc;
pub mod redis;
