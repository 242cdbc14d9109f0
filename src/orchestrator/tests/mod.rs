use super::test_helpers::{
    StubBehavior, StubMediaTool, create_test_orchestrator, create_test_orchestrator_with,
    temp_files, test_config, url,
};
use super::*;
use crate::error::DownloadError;
use std::sync::Arc;
use std::time::Duration;

mod pipeline;
