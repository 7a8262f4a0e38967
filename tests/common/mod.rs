#![allow(dead_code, unused_imports)]

pub use assetflow_test_utils::builders::{ConfigFileBuilder, Project};
pub use assetflow_test_utils::fakes::{
    CountingReloader, FakeTaskBackend, NodeEvent, RecordingNodes, RecordingReporter,
};
pub use assetflow_test_utils::{eventually, init_tracing, with_timeout};
