use std::time::{Duration, Instant};

use log::debug;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::routes::{
    query::ListQuery,
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::submission::{SubmissionPayload, UpdateOutcome};

const SERVER_TIMING_HEADER: &str = "server-timing";

const MESSAGE_PROCESSED: &str = "Submission processed successfully";
const MESSAGE_NOT_EDITABLE: &str = "Submission cannot be edited as its status is not 'new'";

type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn submit(environment: Environment, payload: SubmissionPayload) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::submit(None), e);

        payload
            .validate()
            .map_err(BackendError::from)
            .map_err(error_handler)?;

        debug!(environment.logger, "Creating submission..."; "email" => &payload.user.email);

        let id = environment
            .db
            .create_submission(payload)
            .await
            .map_err(error_handler)?;

        let response = SuccessResponse::Submission {
            status: 1,
            message: MESSAGE_PROCESSED.to_owned(),
            id: Some(id),
        };

        with_header(
            with_status(json(&response), StatusCode::CREATED),
            "location",
            environment.urls.submission(id).as_str(),
        )
    }
}

pub async fn retrieve(environment: Environment, id: i32) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id), e);

        debug!(environment.logger, "Retrieving submission..."; "id" => id);

        let option = environment
            .db
            .retrieve_submission(id)
            .await
            .map_err(error_handler)?;

        match option {
            Some(view) => with_status(json(&view), StatusCode::OK),
            None => with_status(json(&()), StatusCode::NOT_FOUND),
        }
    }
}

pub async fn update(environment: Environment, id: i32, payload: SubmissionPayload) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update(id), e);

        payload
            .validate()
            .map_err(BackendError::from)
            .map_err(error_handler)?;

        debug!(environment.logger, "Updating submission..."; "id" => id);

        let outcome = environment
            .db
            .update_submission(id, payload)
            .await
            .map_err(error_handler)?;

        match outcome {
            UpdateOutcome::Updated => with_status(
                json(&SuccessResponse::Submission {
                    status: 1,
                    message: MESSAGE_PROCESSED.to_owned(),
                    id: Some(id),
                }),
                StatusCode::OK,
            ),
            // a business rejection, not a fault: nothing was changed
            UpdateOutcome::NotEditable { status } => {
                debug!(environment.logger, "Rejecting edit of reviewed submission"; "id" => id, "status" => status.as_str());

                with_status(
                    json(&SuccessResponse::Submission {
                        status: 0,
                        message: MESSAGE_NOT_EDITABLE.to_owned(),
                        id: Some(id),
                    }),
                    StatusCode::BAD_REQUEST,
                )
            }
            UpdateOutcome::NotFound => with_status(json(&()), StatusCode::NOT_FOUND),
        }
    }
}

pub async fn list(environment: Environment, query: ListQuery) -> RouteResult {
    timed! {
        let ListQuery { user_email } = query;

        let error_handler = |e: BackendError| Rejection::new(Context::list(user_email.clone()), e);

        debug!(environment.logger, "Listing submissions..."; "email" => &user_email);

        let summaries = environment
            .db
            .list_by_submitter_email(user_email.clone())
            .await
            .map_err(error_handler)?;

        json(&summaries)
    }
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
