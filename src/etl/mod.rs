mod engine;
mod report;

pub use engine::EtlEngine;
pub use report::RunReport;
