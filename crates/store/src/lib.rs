//! K 线集合的文件系统持久化。

pub mod file;

pub use file::FileBarStore;
