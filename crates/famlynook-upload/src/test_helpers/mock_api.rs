//! Mock Application Server for testing

use async_trait::async_trait;
use famlynook_core::models::{
    ConfirmUploadBody, ContentRecord, LinkMediaBody, LinkTarget, PresignedUploadBody,
    ReleaseUploadBody, UploadGrant,
};
use famlynook_core::ApiStatusError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::traits::MediaApi;

#[derive(Default)]
struct MockState {
    issued: usize,
    queued_grants: VecDeque<UploadGrant>,
    grant_requests: Vec<PresignedUploadBody>,
    confirms: Vec<ConfirmUploadBody>,
    links: Vec<(LinkTarget, LinkMediaBody)>,
    releases: Vec<ReleaseUploadBody>,
    grant_status: Option<u16>,
    confirm_status: Option<u16>,
    link_status: Option<u16>,
    release_status: Option<u16>,
    grant_gate: Option<Arc<Notify>>,
    grant_started: Arc<Notify>,
    before_grant_reply: Option<Arc<dyn Fn() + Send + Sync>>,
}

/// Records every call and answers from canned data.
///
/// Grants are `u{n}`/`k{n}` in issue order unless one was queued; links
/// answer with content `c{n}` pointing at the grant's public URL.
#[derive(Default)]
pub struct MockMediaApi {
    state: Mutex<MockState>,
}

fn rejection(status: u16) -> anyhow::Error {
    ApiStatusError {
        status,
        body: format!("mock rejected with {}", status),
    }
    .into()
}

impl MockMediaApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next grant request with `grant`.
    pub fn queue_grant(&self, grant: UploadGrant) {
        self.state.lock().unwrap().queued_grants.push_back(grant);
    }

    /// Hold grant requests until the returned `Notify` is signaled.
    pub fn hold_grants(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().grant_gate = Some(gate.clone());
        gate
    }

    /// Signaled once per grant request as soon as it reaches the server.
    pub fn grant_started(&self) -> Arc<Notify> {
        self.state.lock().unwrap().grant_started.clone()
    }

    /// Run `hook` after the grant is decided, right before the reply returns.
    pub fn before_grant_reply(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.state.lock().unwrap().before_grant_reply = Some(Arc::new(hook));
    }

    pub fn fail_grant_with(&self, status: u16) {
        self.state.lock().unwrap().grant_status = Some(status);
    }

    pub fn fail_confirm_with(&self, status: u16) {
        self.state.lock().unwrap().confirm_status = Some(status);
    }

    pub fn fail_link_with(&self, status: u16) {
        self.state.lock().unwrap().link_status = Some(status);
    }

    pub fn fail_release_with(&self, status: u16) {
        self.state.lock().unwrap().release_status = Some(status);
    }

    pub fn grant_requests(&self) -> Vec<PresignedUploadBody> {
        self.state.lock().unwrap().grant_requests.clone()
    }

    pub fn confirms(&self) -> Vec<ConfirmUploadBody> {
        self.state.lock().unwrap().confirms.clone()
    }

    pub fn links(&self) -> Vec<(LinkTarget, LinkMediaBody)> {
        self.state.lock().unwrap().links.clone()
    }

    pub fn releases(&self) -> Vec<ReleaseUploadBody> {
        self.state.lock().unwrap().releases.clone()
    }

    fn issue_grant(&self) -> anyhow::Result<UploadGrant> {
        let mut state = self.state.lock().unwrap();
        if let Some(status) = state.grant_status {
            return Err(rejection(status));
        }

        state.issued += 1;
        let n = state.issued;
        Ok(state.queued_grants.pop_front().unwrap_or_else(|| UploadGrant {
            presigned_url: format!("https://store.test/upload/u{}", n),
            upload_id: format!("u{}", n),
            object_key: format!("k{}", n),
            public_url: format!("https://cdn.test/k{}", n),
        }))
    }
}

#[async_trait]
impl MediaApi for MockMediaApi {
    async fn request_upload(&self, body: &PresignedUploadBody) -> anyhow::Result<UploadGrant> {
        let (gate, started, hook) = {
            let mut state = self.state.lock().unwrap();
            state.grant_requests.push(body.clone());
            (
                state.grant_gate.clone(),
                state.grant_started.clone(),
                state.before_grant_reply.clone(),
            )
        };

        started.notify_one();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let result = self.issue_grant();
        if let Some(hook) = hook {
            hook();
        }
        result
    }

    async fn confirm_upload(&self, body: &ConfirmUploadBody) -> anyhow::Result<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        state.confirms.push(body.clone());
        match state.confirm_status {
            Some(status) => Err(rejection(status)),
            None => Ok(serde_json::json!({ "status": "completed", "key": body.key })),
        }
    }

    async fn link_media(
        &self,
        target: &LinkTarget,
        body: &LinkMediaBody,
    ) -> anyhow::Result<ContentRecord> {
        let mut state = self.state.lock().unwrap();
        state.links.push((target.clone(), body.clone()));
        if let Some(status) = state.link_status {
            return Err(rejection(status));
        }

        Ok(ContentRecord {
            content_id: Some(format!("c{}", state.links.len())),
            file_path: Some(body.file_url.clone()),
            extra: serde_json::Map::new(),
        })
    }

    async fn release_upload(&self, body: &ReleaseUploadBody) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.releases.push(body.clone());
        match state.release_status {
            Some(status) => Err(rejection(status)),
            None => Ok(()),
        }
    }
}
