//! 配置模型

pub mod config;
