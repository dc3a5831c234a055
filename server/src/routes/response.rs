use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    /// The `{status, message, id}` body shared by the creation and
    /// update endpoints. `status` is 1 for success and 0 for a
    /// business rejection.
    Submission {
        status: u8,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<i32>,
    },
}
