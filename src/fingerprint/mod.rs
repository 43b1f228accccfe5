//! 指纹模块：数据模型、源解析与缓存

pub mod model;
pub mod resolver;
pub mod cache;

pub use self::model::{
    DetectionOutcome, DetectorSpec, Fingerprint, FingerprintMap, PatternList,
    UNIDENTIFIED_CATEGORY, normalize_map,
};
pub use self::resolver::FingerprintResolver;
pub use self::cache::FingerprintCache;
