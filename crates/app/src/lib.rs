//! `barfetch` 可执行程序的装配层：命令行、配置合并、日志与退出码。

pub mod cli;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod settings;
