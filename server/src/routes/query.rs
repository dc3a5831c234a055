use serde::Deserialize;

/// The query string of the listing endpoint. The parameter name
/// follows the original contract: `?user__email=<email>`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "user__email")]
    pub user_email: String,
}
