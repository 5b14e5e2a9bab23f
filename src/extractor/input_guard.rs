//! HTML输入守卫
//! 在进入提取/匹配前保证输入「值得分析」，拒绝空白与过短内容

use crate::error::{RtdResult, TechDetectError};

pub struct HtmlInputGuard;

impl HtmlInputGuard {
    /// 最小有效长度（过滤垃圾输入）
    pub const MIN_VALID_LEN: usize = 16;

    /// 校验输入并裁剪两端空白控制字符
    pub fn guard(html: &str) -> RtdResult<&str> {
        if html.is_empty() {
            return Err(TechDetectError::EvidenceExtractError(
                "响应体为空".to_string(),
            ));
        }

        let trimmed =
            html.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control());
        if trimmed.len() < Self::MIN_VALID_LEN {
            return Err(TechDetectError::EvidenceExtractError(format!(
                "有效内容过短（{}字节）",
                trimmed.len()
            )));
        }

        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_rejects_empty_and_short() {
        // 测试场景：空输入与过短输入均被拒绝
        assert!(HtmlInputGuard::guard("").is_err());
        assert!(HtmlInputGuard::guard("  <p>x</p>  ").is_err());
    }

    #[test]
    fn test_guard_trims_whitespace() {
        // 测试场景：两端空白被裁剪，正文原样返回
        let html = "\n\t  <html><body>hello</body></html>  \n";
        assert_eq!(
            HtmlInputGuard::guard(html).unwrap(),
            "<html><body>hello</body></html>"
        );
    }
}
