//! Header格式转换工具
//! 把reqwest的HeaderMap转换为检测接口使用的多值映射

use std::collections::HashMap;

use reqwest::header::HeaderMap;
use tracing::debug;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap转换为HashMap<String, Vec<String>>
    /// 名称统一小写；无法转为字符串的值按空串处理
    pub fn to_hashmap(header_map: &HeaderMap) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();

        for (key, value) in header_map.iter() {
            let key_str = key.as_str().to_lowercase();
            let value_str = value.to_str().unwrap_or("").to_string();

            map.entry(key_str).or_default().push(value_str);
        }

        debug!("Header转换完成，生成{}条记录", map.len());

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn test_to_hashmap_groups_multi_values() {
        // 测试场景：同名Header的多个值聚合到同一键下
        let mut header_map = HeaderMap::new();
        header_map.append(
            HeaderName::from_static("set-cookie"),
            HeaderValue::from_static("a=1; Path=/"),
        );
        header_map.append(
            HeaderName::from_static("set-cookie"),
            HeaderValue::from_static("b=2; Path=/"),
        );
        header_map.insert(
            HeaderName::from_static("server"),
            HeaderValue::from_static("nginx"),
        );

        let map = HeaderConverter::to_hashmap(&header_map);
        assert_eq!(map.get("set-cookie").unwrap().len(), 2);
        assert_eq!(map.get("server").unwrap(), &vec!["nginx".to_string()]);
    }
}
