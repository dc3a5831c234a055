use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    List { email: String },
    Retrieve { id: i32 },
    Submit { id: Option<i32> },
    Update { id: i32 },
}

impl Context {
    pub fn list(email: String) -> Context {
        Context::List { email }
    }

    pub fn retrieve(id: i32) -> Context {
        Context::Retrieve { id }
    }

    pub fn submit(id: Option<i32>) -> Context {
        Context::Submit { id }
    }

    pub fn update(id: i32) -> Context {
        Context::Update { id }
    }
}
