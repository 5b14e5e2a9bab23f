//! Offline detection demonstration for rstechdetect
//! rstechdetect 离线指纹识别演示程序
//! 功能说明：
//! 1. 演示自定义签名库（完全离线，不访问网络）的加载与编译
//! 2. 展示完整的指纹识别流程（Header/Cookie/HTML/Script/Meta/JS多通道检测）
//! 3. 包含关联闭包推导与分类/分组富化结果输出
//!
//! 运行命令：
//! cargo run --example detect_demo

use std::collections::HashMap;
use std::time::Instant;

use anyhow::Result;
use rstechdetect::{
    ConfigManager, CorpusSupplier, RawCorpus, TechDetector,
};
use serde_json::json;

fn main() -> Result<()> {
    // ========== 1. 日志系统初始化 ==========
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    // ========== 2. 构造演示用签名库 ==========
    let technologies = json!({
        "WordPress": {
            "cats": [1, 11],
            "description": "WordPress is a free and open-source content management system.",
            "website": "https://wordpress.org",
            "meta": {"generator": "WordPress"},
            "html": "wp-content",
            "implies": ["PHP", "MySQL"]
        },
        "PHP": {
            "cats": [27],
            "website": "https://php.net",
            "headers": {"X-Powered-By": "PHP(?:/([\\d.]+))?"},
            "cookies": {"phpsessid": ".+"}
        },
        "MySQL": {"cats": [34], "website": "https://mysql.com"},
        "jQuery": {
            "cats": [59],
            "website": "https://jquery.com",
            "scriptSrc": "jquery[.-]"
        }
    });
    let categories = json!({
        "1": {"name": "CMS", "priority": 1, "groups": [2]},
        "11": {"name": "Blogs", "priority": 1, "groups": [2]},
        "27": {"name": "Programming languages", "priority": 5, "groups": [9]},
        "34": {"name": "Databases", "priority": 5, "groups": [9]},
        "59": {"name": "JavaScript libraries", "priority": 6, "groups": [9]}
    });
    let groups = json!({
        "2": {"name": "Content"},
        "9": {"name": "Web development"}
    });

    let corpus = RawCorpus {
        technologies: CorpusSupplier::normalize_technologies(technologies)?,
        categories: serde_json::from_value(categories)?,
        groups: serde_json::from_value(groups)?,
    };

    // ========== 3. 初始化检测器（内存签名库，无网络依赖） ==========
    let detector = TechDetector::with_corpus(corpus, ConfigManager::get_default())?;
    println!("指纹检测器初始化完成 | 技术签名数：{}", detector.compiled().techs.len());

    // ========== 4. 构造模拟响应数据 ==========
    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    headers.insert("X-Powered-By".to_string(), vec!["PHP/8.2.7".to_string()]);
    headers.insert(
        "Set-Cookie".to_string(),
        vec!["PHPSESSID=f00dbabe; Path=/; HttpOnly".to_string()],
    );

    let body = br#"<html>
<head>
    <title>Demo Blog</title>
    <meta name="generator" content="WordPress 6.4.2">
    <script src="/wp-includes/js/jquery/jquery-3.7.1.min.js"></script>
</head>
<body class="wp-content">hello</body>
</html>"#;

    // ========== 5. 执行指纹检测（含耗时统计） ==========
    let start = Instant::now();
    let (matched, title) = detector.detect_with_title(&headers, body);
    let detect_cost = start.elapsed();

    println!("检测完成 | 耗时：{:?} | 页面标题：{}", detect_cost, title);

    // ========== 6. 输出富化结果 ==========
    let tech_info = detector.detect_with_tech_info(&headers, body);
    let mut names: Vec<&String> = matched.iter().collect();
    names.sort();
    for name in names {
        if let Some(info) = tech_info.get(name) {
            println!("  - {}", info);
        }
    }

    println!(
        "分组 [Web development] 下技术：{:?}",
        detector.techs_in_group(9)
    );

    Ok(())
}
