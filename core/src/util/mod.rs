pub mod window;
pub mod window_read;
