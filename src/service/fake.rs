/// Recording stand-in for the remote service (tests only)

use std::sync::{Arc, Mutex};

use super::{CallFuture, Candidate, ContentUnit, ImageService, OutputConstraints};
use crate::error::ServiceError;

/// What the fake answers with
#[derive(Debug, Clone)]
pub enum Reply {
    Candidates(Vec<Candidate>),
    Status(u16),
}

/// Returns a canned reply and remembers every request it saw
#[derive(Debug, Clone)]
pub struct FakeService {
    reply: Reply,
    calls: Arc<Mutex<Vec<(Vec<ContentUnit>, OutputConstraints)>>>,
}

impl FakeService {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answers with one candidate holding a single PNG unit
    pub fn returning_image(data: &str) -> Self {
        Self::new(Reply::Candidates(vec![Candidate {
            units: vec![ContentUnit::Inline {
                mime_type: "image/png".to_string(),
                data: data.to_string(),
            }],
        }]))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Units of the nth request
    pub fn units(&self, index: usize) -> Vec<ContentUnit> {
        self.calls.lock().unwrap()[index].0.clone()
    }

    pub fn constraints(&self, index: usize) -> OutputConstraints {
        self.calls.lock().unwrap()[index].1.clone()
    }
}

impl ImageService for FakeService {
    fn call<'a>(&'a self, units: &'a [ContentUnit], constraints: &'a OutputConstraints) -> CallFuture<'a> {
        self.calls
            .lock()
            .unwrap()
            .push((units.to_vec(), constraints.clone()));

        let reply = self.reply.clone();
        Box::pin(async move {
            match reply {
                Reply::Candidates(candidates) => Ok(candidates),
                Reply::Status(status) => Err(ServiceError::Status {
                    status,
                    body: "fake failure".to_string(),
                }),
            }
        })
    }
}
