//! HTML标签提取器
//! 负责从HTML中提取script记录（外部源URL + 内联内容）、meta标签与页面标题
//!
//! 基于html5ever流式分词实现；script与title通过原始文本分词状态收集
//! 标签内文本，不构建DOM

use std::cell::{Cell, RefCell};

use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    states::RawKind,
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

/// 单条脚本记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptRecord {
    /// 外部脚本源URL（src属性）
    pub source: Option<String>,
    /// 内联脚本内容
    pub content: String,
}

#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor {
    scripts: RefCell<Vec<ScriptRecord>>,
    current_script: RefCell<Option<ScriptRecord>>,
    meta_tags: RefCell<Vec<(String, String)>>,
    title: RefCell<Option<String>>,
    in_title: Cell<bool>,
}

impl TokenSink for HtmlExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(Tag {
                kind: TagKind::StartTag,
                name,
                self_closing,
                attrs,
            }) => match name.as_ref() {
                "script" => {
                    let record = ScriptRecord {
                        source: find_attr(&attrs, "src"),
                        content: String::new(),
                    };
                    // 自闭合script无内联内容，直接落盘
                    if self_closing {
                        self.push_script(record);
                        return TokenSinkResult::Continue;
                    }
                    *self.current_script.borrow_mut() = Some(record);
                    // 切换分词器到脚本原始文本状态，内联内容以字符Token送达
                    return TokenSinkResult::RawData(RawKind::ScriptData);
                }
                "meta" => {
                    self.extract_meta_tag(&attrs);
                }
                "title" => {
                    if self.title.borrow().is_none() {
                        self.in_title.set(true);
                        return TokenSinkResult::RawData(RawKind::Rcdata);
                    }
                }
                _ => {}
            },
            Token::TagToken(Tag {
                kind: TagKind::EndTag,
                name,
                ..
            }) => match name.as_ref() {
                "script" => self.finish_script(),
                "title" => self.in_title.set(false),
                _ => {}
            },
            Token::CharacterTokens(text) => {
                if let Some(record) = self.current_script.borrow_mut().as_mut() {
                    record.content.push_str(&text);
                } else if self.in_title.get() {
                    let mut title = self.title.borrow_mut();
                    match title.as_mut() {
                        Some(existing) => existing.push_str(&text),
                        None => *title = Some(text.to_string()),
                    }
                }
            }
            // 文档结束时落盘未闭合的script
            Token::EOFToken => self.finish_script(),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl HtmlExtractor {
    /// 创建新的提取器
    pub fn new() -> Self {
        Self::default()
    }

    /// 从HTML字符串提取标签
    pub fn extract(&self, html: &str) -> Self {
        let tokenizer = Tokenizer::new(self.clone(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink
    }

    fn push_script(&self, record: ScriptRecord) {
        if record.source.is_some() || !record.content.is_empty() {
            self.scripts.borrow_mut().push(record);
        }
    }

    fn finish_script(&self) {
        if let Some(record) = self.current_script.borrow_mut().take() {
            self.push_script(record);
        }
    }

    /// 提取meta标签的name/content属性对
    fn extract_meta_tag(&self, attrs: &[Attribute]) {
        let mut name = None;
        let mut content = None;

        for attr in attrs {
            match attr.name.local.as_ref() {
                "name" => name = Some(attr.value.to_string().to_lowercase()),
                "content" => content = Some(attr.value.to_string()),
                _ => {}
            }
        }

        if let (Some(n), Some(c)) = (name, content) {
            self.meta_tags.borrow_mut().push((n, c));
        }
    }

    /// 获取提取到的脚本记录列表
    pub fn get_scripts(&self) -> Vec<ScriptRecord> {
        self.scripts.borrow().clone()
    }

    /// 获取提取到的外部脚本源URL列表
    pub fn get_script_srcs(&self) -> Vec<String> {
        self.scripts
            .borrow()
            .iter()
            .filter_map(|s| s.source.clone())
            .collect()
    }

    /// 获取提取到的meta标签列表（名称已小写）
    pub fn get_meta_tags(&self) -> Vec<(String, String)> {
        self.meta_tags.borrow().clone()
    }

    /// 获取页面标题（取首个title标签）
    pub fn get_title(&self) -> String {
        self.title.borrow().clone().unwrap_or_default()
    }
}

fn find_attr(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.name.local.as_ref() == name)
        .map(|attr| attr.value.to_string())
}
