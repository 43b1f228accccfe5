//! 简单选择器解析与匹配
//! 支持复合简单选择器（tag #id .class [attr] [attr=value]）与逗号分组；
//! 含组合器的选择器取最右复合选择器作为匹配主体（扁平元素索引无父子关系）

use once_cell::sync::Lazy;
use regex::Regex;

use super::extractor::ElementRecord;
use crate::error::{RstechscanError, RtsResult};

static IDENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap()
});

/// 复合选择器的组成部分
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorPart {
    Tag(String),
    Id(String),
    Class(String),
    AttrPresent(String),
    AttrEquals(String, String),
}

/// 解析后的复合选择器
#[derive(Debug, Clone)]
pub struct CompoundSelector {
    parts: Vec<SelectorPart>,
}

impl CompoundSelector {
    /// 解析选择器组（逗号分隔，任一命中即命中）
    pub fn parse_group(selector: &str) -> RtsResult<Vec<CompoundSelector>> {
        let groups: Vec<&str> = selector
            .split(',')
            .map(str::trim)
            .filter(|group| !group.is_empty())
            .collect();

        if groups.is_empty() {
            return Err(RstechscanError::InvalidInput(format!("选择器[{}]为空", selector)));
        }

        groups.into_iter().map(Self::parse_single).collect()
    }

    /// 解析单个选择器，取最右复合选择器作为匹配主体
    fn parse_single(selector: &str) -> RtsResult<CompoundSelector> {
        let subject = selector
            .rsplit(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
            .find(|segment| !segment.is_empty())
            .unwrap_or("");

        if subject.is_empty() {
            return Err(RstechscanError::InvalidInput(format!("选择器[{}]无匹配主体", selector)));
        }

        let chars: Vec<char> = subject.chars().collect();
        let mut parts = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '*' => i += 1,
                '#' => {
                    let (ident, next) = Self::read_ident(&chars, i + 1, subject)?;
                    parts.push(SelectorPart::Id(ident));
                    i = next;
                }
                '.' => {
                    let (ident, next) = Self::read_ident(&chars, i + 1, subject)?;
                    parts.push(SelectorPart::Class(ident));
                    i = next;
                }
                '[' => {
                    let mut j = i + 1;
                    while j < chars.len() && chars[j] != ']' {
                        j += 1;
                    }
                    if j >= chars.len() {
                        return Err(RstechscanError::InvalidInput(format!(
                            "选择器[{}]属性括号未闭合",
                            subject
                        )));
                    }
                    let inner: String = chars[i + 1..j].iter().collect();
                    parts.push(Self::parse_attr(&inner, subject)?);
                    i = j + 1;
                }
                ':' => {
                    return Err(RstechscanError::DetectorQuery(format!(
                        "选择器[{}]包含不支持的伪类",
                        subject
                    )));
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let (ident, next) = Self::read_ident(&chars, i, subject)?;
                    parts.push(SelectorPart::Tag(ident.to_ascii_lowercase()));
                    i = next;
                }
                c => {
                    return Err(RstechscanError::InvalidInput(format!(
                        "选择器[{}]存在无法解析的字符'{}'",
                        subject, c
                    )));
                }
            }
        }

        if parts.is_empty() {
            return Err(RstechscanError::InvalidInput(format!("选择器[{}]无有效组成", subject)));
        }
        Ok(CompoundSelector { parts })
    }

    fn read_ident(chars: &[char], start: usize, selector: &str) -> RtsResult<(String, usize)> {
        let mut end = start;
        while end < chars.len()
            && (chars[end].is_ascii_alphanumeric() || matches!(chars[end], '_' | '-'))
        {
            end += 1;
        }
        if end == start {
            return Err(RstechscanError::InvalidInput(format!(
                "选择器[{}]标识符为空",
                selector
            )));
        }
        Ok((chars[start..end].iter().collect(), end))
    }

    fn parse_attr(inner: &str, selector: &str) -> RtsResult<SelectorPart> {
        match inner.split_once('=') {
            Some((name, value)) => {
                let name = name.trim().to_string();
                if !IDENT_RE.is_match(&name) {
                    return Err(RstechscanError::InvalidInput(format!(
                        "选择器[{}]属性名无效",
                        selector
                    )));
                }
                let value = value
                    .trim()
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string();
                Ok(SelectorPart::AttrEquals(name, value))
            }
            None => {
                let name = inner.trim().to_string();
                if !IDENT_RE.is_match(&name) {
                    return Err(RstechscanError::InvalidInput(format!(
                        "选择器[{}]属性名无效",
                        selector
                    )));
                }
                Ok(SelectorPart::AttrPresent(name))
            }
        }
    }

    /// 元素是否满足全部组成部分
    pub fn matches(&self, element: &ElementRecord) -> bool {
        self.parts.iter().all(|part| match part {
            SelectorPart::Tag(tag) => element.tag == *tag,
            SelectorPart::Id(id) => element.id.as_deref() == Some(id.as_str()),
            SelectorPart::Class(class) => element.classes.iter().any(|c| c == class),
            SelectorPart::AttrPresent(name) => element.attrs.iter().any(|(n, _)| n == name),
            SelectorPart::AttrEquals(name, value) => {
                element.attrs.iter().any(|(n, v)| n == name && v == value)
            }
        })
    }
}

/// 选择器组是否命中元素索引中的任一元素
pub fn any_match(selector: &str, elements: &[ElementRecord]) -> RtsResult<bool> {
    let compounds = CompoundSelector::parse_group(selector)?;
    Ok(elements
        .iter()
        .any(|element| compounds.iter().any(|compound| compound.matches(element))))
}
