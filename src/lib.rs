pub mod compare;
pub mod display;
pub mod error;
pub mod ffmpeg;
pub mod gop;
pub mod iter;
pub mod listing;
pub mod logging;
pub mod progress;
