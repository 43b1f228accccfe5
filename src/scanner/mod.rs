//! 扫描模块：进度事件与扫描编排

pub mod events;
pub mod orchestrator;

pub use self::events::{DetectedCallback, ProgressCallback, ProgressEvent, TechnologyHit};
pub use self::orchestrator::ScanOrchestrator;
