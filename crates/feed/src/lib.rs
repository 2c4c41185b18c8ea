//! 远程回放引擎的本地实现：从磁盘上录制好的 K 线磁带回放历史数据。

pub mod tape;

pub use tape::{TapeEngine, TapeRecord, parse_tape};
