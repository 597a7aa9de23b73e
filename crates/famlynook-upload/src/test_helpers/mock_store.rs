//! Mock object storage for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::traits::{ObjectStore, PutObject};

/// Progress reports emitted per simulated PUT.
const PROGRESS_STEPS: u64 = 4;

/// A PUT as the store received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPut {
    pub url: String,
    pub content_type: String,
    pub source: PathBuf,
    pub content_length: Option<u64>,
}

struct MockStoreState {
    status: u16,
    status_by_file: HashMap<String, u16>,
    hang: bool,
    puts: Vec<RecordedPut>,
}

/// Accepts every PUT with 200 unless told otherwise.
pub struct MockObjectStore {
    state: Mutex<MockStoreState>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockStoreState {
                status: 200,
                status_by_file: HashMap::new(),
                hang: false,
                puts: Vec::new(),
            }),
        }
    }

    /// Answer every PUT with `status`.
    pub fn respond_with(&self, status: u16) {
        self.state.lock().unwrap().status = status;
    }

    /// Answer PUTs of a source named `file_name` with `status`.
    pub fn respond_with_for(&self, file_name: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .status_by_file
            .insert(file_name.to_string(), status);
    }

    /// Report some progress, then never answer.
    pub fn hang_forever(&self) {
        self.state.lock().unwrap().hang = true;
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.state.lock().unwrap().puts.clone()
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put_object(
        &self,
        object: PutObject<'_>,
        progress: UnboundedSender<u64>,
    ) -> anyhow::Result<u16> {
        let (status, hang) = {
            let mut state = self.state.lock().unwrap();
            state.puts.push(RecordedPut {
                url: object.url.to_string(),
                content_type: object.content_type.to_string(),
                source: object.source.to_path_buf(),
                content_length: object.content_length,
            });
            let file_name = object
                .source
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let status = state
                .status_by_file
                .get(file_name)
                .copied()
                .unwrap_or(state.status);
            (status, state.hang)
        };

        let total = tokio::fs::metadata(object.source).await?.len();
        let sent_steps = if hang { PROGRESS_STEPS / 2 } else { PROGRESS_STEPS };
        for step in 1..=sent_steps {
            let _ = progress.send(total * step / PROGRESS_STEPS);
            tokio::task::yield_now().await;
        }

        if hang {
            futures::future::pending::<()>().await;
        }

        Ok(status)
    }
}
