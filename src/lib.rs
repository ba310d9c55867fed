pub mod spdy;

pub use spdy::codec::{FrameCodec, WireCodec};
pub use spdy::frames::{Frame, FrameKind, HeaderBlock, StatusCode, StreamId};
pub use spdy::queue::FramePriorityQueue;
pub use spdy::stream::Stream;
pub use spdy::Version;
