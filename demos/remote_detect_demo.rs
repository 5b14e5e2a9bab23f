//! Remote corpus detection demonstration for rstechdetect
//! rstechdetect 远程签名库指纹识别演示程序
//! 功能说明：
//! 1. 演示远程签名库的拉取、本地缓存与检测器构建（需要网络）
//! 2. 使用全局检测器单例，适配多处调用共享一份编译后签名库
//!
//! 运行命令：
//! cargo run --example remote_detect_demo

use std::collections::HashMap;

use anyhow::Result;
use rstechdetect::{ConfigManager, detect_technologies, init_global_detector_with_config};

#[tokio::main]
async fn main() -> Result<()> {
    // ========== 1. 日志系统初始化 ==========
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    // ========== 2. 初始化全局检测器（远程签名库，缓存优先） ==========
    let config = ConfigManager::custom()
        .cache_path(std::env::temp_dir().join("rstechdetect_corpus.mp"))
        .http_timeout(30)
        .build();
    init_global_detector_with_config(config).await?;
    println!("全局检测器初始化完成");

    // ========== 3. 构造模拟响应并检测 ==========
    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    headers.insert("Server".to_string(), vec!["nginx/1.25.3".to_string()]);
    headers.insert("X-Powered-By".to_string(), vec!["PHP/8.2.7".to_string()]);

    let body = br#"<html><head>
        <meta name="generator" content="WordPress 6.4.2">
        <script src="/wp-includes/js/jquery/jquery-3.7.1.min.js"></script>
    </head><body>hello</body></html>"#;

    let matched = detect_technologies(&headers, body)?;
    let mut names: Vec<&String> = matched.iter().collect();
    names.sort();
    println!("命中技术（{}个）：", names.len());
    for name in names {
        println!("  - {}", name);
    }

    Ok(())
}
