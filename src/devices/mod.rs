//! Host-side devices shared by parts and the board.

pub mod rx_buffer;

pub use rx_buffer::RxBuffer;
