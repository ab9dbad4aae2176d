mod buffer;

pub use buffer::{Buffer, EditEvent};
