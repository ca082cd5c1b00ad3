use hometrain_core::plan::{PlanGenerator, PlanRepository};
use hometrain_core::rejection::RejectionRepository;
use hometrain_core::session::SessionRepository;
use std::sync::Arc;

/// The external collaborators of the session core.
#[derive(Clone)]
pub struct TrainingServices {
    pub generator: Arc<dyn PlanGenerator>,
    pub plans: Arc<dyn PlanRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub rejections: Arc<dyn RejectionRepository>,
}

impl TrainingServices {
    /// Uses one backend for every collaborator.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: PlanGenerator + PlanRepository + SessionRepository + RejectionRepository + 'static,
    {
        Self {
            generator: backend.clone(),
            plans: backend.clone(),
            sessions: backend.clone(),
            rejections: backend,
        }
    }
}
