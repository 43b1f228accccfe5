//! 指纹数据模型定义
//! 仅存储指纹数据，无任何业务逻辑，支持序列化/反序列化

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};

/// 无分类指纹在输出时使用的占位分类（仅输出时归一化，存储时保持为空）
pub const UNIDENTIFIED_CATEGORY: &str = "unidentified";

/// 正则模式：单个或列表（JSON两种写法等价）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternList {
    One(String),
    Many(Vec<String>),
}

impl PatternList {
    /// 展开为模式切片
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            PatternList::One(s) => vec![s.as_str()],
            PatternList::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// 检测器策略配置（六类，全部可选；缺失即跳过对应策略）
/// 空列表与缺失等价：不命中也不报错
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSpec {
    #[serde(rename = "htmlContains", skip_serializing_if = "Vec::is_empty")]
    pub html_contains: Vec<String>,
    #[serde(rename = "htmlRegex", skip_serializing_if = "Option::is_none")]
    pub html_regex: Option<String>,
    #[serde(rename = "requestUrlRegex", skip_serializing_if = "Option::is_none")]
    pub request_url_regex: Option<PatternList>,
    #[serde(rename = "selectorExists", skip_serializing_if = "Vec::is_empty")]
    pub selector_exists: Vec<String>,
    #[serde(rename = "globalVariables", skip_serializing_if = "Vec::is_empty")]
    pub global_variables: Vec<String>,
    #[serde(rename = "cssCommentRegex", skip_serializing_if = "Option::is_none")]
    pub css_comment_regex: Option<String>,
}

impl DetectorSpec {
    /// 是否未配置任何策略
    pub fn is_empty(&self) -> bool {
        self.html_contains.is_empty()
            && self.html_regex.is_none()
            && self.request_url_regex.is_none()
            && self.selector_exists.is_empty()
            && self.global_variables.is_empty()
            && self.css_comment_regex.is_none()
    }
}

/// 技术指纹定义（从JSON解析，加载后不可变）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub detectors: DetectorSpec,
}

impl Fingerprint {
    /// 从名称快速创建（默认值）
    pub fn from_name(name: String) -> Self {
        Self {
            name,
            categories: Vec::new(),
            detectors: DetectorSpec::default(),
        }
    }

    /// 输出用分类（空分类归一化为 unidentified）
    pub fn output_categories(&self) -> Vec<String> {
        if self.categories.is_empty() {
            vec![UNIDENTIFIED_CATEGORY.to_string()]
        } else {
            self.categories.clone()
        }
    }
}

/// 指纹库：技术名 -> 指纹，键唯一，迭代顺序仅影响结果排序
pub type FingerprintMap = HashMap<String, Fingerprint>;

/// 归一化指纹库：键覆盖内嵌name字段（两者必须一致）
pub fn normalize_map(mut map: FingerprintMap) -> FingerprintMap {
    for (name, fingerprint) in map.iter_mut() {
        fingerprint.name = name.clone();
    }
    map
}

/// 单技术检测结果（每次扫描新建，创建后不再修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub name: String,
    pub categories: Vec<String>,
    pub detected: bool,
}

// ======== 为 DetectionOutcome 实现 Display trait（用于 CLI / Report 输出） ========
impl fmt::Display for DetectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.detected { "+" } else { "-" };
        write!(f, "[{}] {} ({})", mark, self.name, self.categories.join(", "))
    }
}
