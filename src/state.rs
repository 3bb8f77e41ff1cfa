use crate::backend::Backend;
use crate::dispatch::DispatchTable;
use crate::policy::AdmissionPolicy;
use std::sync::Arc;

/// Read-only state shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) dispatch: Arc<DispatchTable>,
    pub(crate) policy: Arc<dyn AdmissionPolicy>,
    pub(crate) backend: Option<Arc<dyn Backend>>,
}

impl AppState {
    pub fn new(
        dispatch: DispatchTable,
        policy: Arc<dyn AdmissionPolicy>,
        backend: Option<Arc<dyn Backend>>,
    ) -> Self {
        Self {
            dispatch: Arc::new(dispatch),
            policy,
            backend,
        }
    }
}
