//! vup-tracker - 虚拟主播发现与缓存对账服务
//!
//! 周期性地从直播平台拉取正在直播的直播间，识别其中的虚拟主播并写入持久化存储，
//! 同时让缓存集合与持久化存储保持一致。

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod upstream;
