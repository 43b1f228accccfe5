//! HTML标签提取器
//! 从HTML中提取资源URL、样式表链接、内联脚本/样式文本与元素索引

use std::cell::RefCell;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html5ever::tokenizer::states::RawKind;
use markup5ever::interface::Attribute;
use tendril::StrTendril;

/// 元素索引项（选择器匹配用）
#[derive(Debug, Clone)]
pub struct ElementRecord {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
}

/// 当前字符流的归属（script/style内联文本收集）
#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum TextSink {
    #[default]
    None,
    Script,
    Style,
}

#[derive(Debug, Default, Clone)]
pub struct PageExtractor {
    resource_urls: RefCell<Vec<String>>,
    stylesheet_hrefs: RefCell<Vec<String>>,
    inline_scripts: RefCell<Vec<String>>,
    inline_styles: RefCell<Vec<String>>,
    elements: RefCell<Vec<ElementRecord>>,
    text_sink: RefCell<TextSink>,
}

impl TokenSink for PageExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(Tag {
                kind: TagKind::StartTag,
                name,
                attrs,
                self_closing,
            }) => {
                let tag = name.as_ref();
                self.record_element(tag, &attrs);

                match tag {
                    "script" => match Self::attr_value(&attrs, "src") {
                        Some(src) => self.resource_urls.borrow_mut().push(src),
                        None if !self_closing => {
                            *self.text_sink.borrow_mut() = TextSink::Script;
                            self.inline_scripts.borrow_mut().push(String::new());
                            return TokenSinkResult::RawData(RawKind::ScriptData);
                        }
                        None => {}
                    },
                    "style" if !self_closing => {
                        *self.text_sink.borrow_mut() = TextSink::Style;
                        self.inline_styles.borrow_mut().push(String::new());
                        return TokenSinkResult::RawData(RawKind::Rawtext);
                    }
                    "link" => {
                        if let Some(href) = Self::attr_value(&attrs, "href") {
                            if Self::is_stylesheet_link(&attrs) {
                                self.stylesheet_hrefs.borrow_mut().push(href.clone());
                            }
                            self.resource_urls.borrow_mut().push(href);
                        }
                    }
                    "img" | "iframe" | "source" | "embed" | "video" | "audio" => {
                        if let Some(src) = Self::attr_value(&attrs, "src") {
                            self.resource_urls.borrow_mut().push(src);
                        }
                    }
                    _ => {}
                }
            }
            Token::TagToken(Tag {
                kind: TagKind::EndTag,
                name,
                ..
            }) => {
                if matches!(name.as_ref(), "script" | "style") {
                    *self.text_sink.borrow_mut() = TextSink::None;
                }
            }
            Token::CharacterTokens(text) => match *self.text_sink.borrow() {
                TextSink::Script => {
                    if let Some(buffer) = self.inline_scripts.borrow_mut().last_mut() {
                        buffer.push_str(&text);
                    }
                }
                TextSink::Style => {
                    if let Some(buffer) = self.inline_styles.borrow_mut().last_mut() {
                        buffer.push_str(&text);
                    }
                }
                TextSink::None => {}
            },
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl PageExtractor {
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

    fn attr_value(attrs: &[Attribute], name: &str) -> Option<String> {
        attrs
            .iter()
            .find(|attr| attr.name.local.as_ref() == name)
            .map(|attr| attr.value.to_string())
    }

    fn is_stylesheet_link(attrs: &[Attribute]) -> bool {
        Self::attr_value(attrs, "rel").is_some_and(|rel| {
            rel.to_ascii_lowercase()
                .split_whitespace()
                .any(|token| token == "stylesheet")
        })
    }

    /// 记录元素索引项
    fn record_element(&self, tag: &str, attrs: &[Attribute]) {
        let mut id = None;
        let mut classes = Vec::new();
        let mut attr_pairs = Vec::new();

        for attr in attrs {
            let attr_name = attr.name.local.as_ref().to_string();
            let value = attr.value.to_string();
            match attr_name.as_str() {
                "id" => id = Some(value.clone()),
                "class" => classes = value.split_whitespace().map(str::to_string).collect(),
                _ => {}
            }
            attr_pairs.push((attr_name, value));
        }

        self.elements.borrow_mut().push(ElementRecord {
            tag: tag.to_string(),
            id,
            classes,
            attrs: attr_pairs,
        });
    }

    /// 获取提取到的资源URL列表（script/link/img等标签的引用）
    pub fn resource_urls(&self) -> Vec<String> {
        self.resource_urls.borrow().clone()
    }

    /// 获取样式表链接href列表
    pub fn stylesheet_hrefs(&self) -> Vec<String> {
        self.stylesheet_hrefs.borrow().clone()
    }

    /// 获取内联脚本文本（拼接）
    pub fn inline_script_text(&self) -> String {
        self.inline_scripts.borrow().join("\n")
    }

    /// 获取内联样式文本（拼接）
    pub fn inline_style_text(&self) -> String {
        self.inline_styles.borrow().join("\n")
    }

    /// 获取元素索引
    pub fn elements(&self) -> Vec<ElementRecord> {
        self.elements.borrow().clone()
    }
}
