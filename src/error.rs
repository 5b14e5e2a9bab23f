//! 全局错误类型定义

use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::{io::Error as IoError, time::SystemTimeError};
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum TechDetectError {
    // 指纹库相关错误
    #[error("指纹库获取失败：{0}")]
    CorpusUnavailable(String),
    #[error("指纹库结构解析失败：{0}")]
    CorpusError(String),
    #[error("指纹库缓存失败：{0}")]
    CorpusCacheError(String),

    // 模式编译相关错误
    #[error("模式解析失败：{0}")]
    InvalidPattern(String),
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),

    // 证据提取相关错误
    #[error("页面证据提取失败：{0}")]
    EvidenceExtractError(String),

    // 检测相关错误
    #[error("检测器未初始化")]
    DetectorNotInitialized,

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPackError(String),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("系统时间计算失败：{0}")]
    SystemTimeError(#[from] SystemTimeError),
}

// 全局Result类型
pub type RtdResult<T> = Result<T, TechDetectError>;
