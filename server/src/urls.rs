use url::Url;

/// Convenience wrapper for URL generation functions.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Path for all submission-related actions.
    pub(crate) submissions_path: String,

    /// Prefix for all submission-related actions.
    submissions_prefix: String,
}

impl Urls {
    /// Create a new instance. `submissions_prefix` should *not* include a trailing slash.
    pub fn new(base: impl AsRef<str>, submissions_prefix: impl Into<String>) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));
        let submissions_path = submissions_prefix.into();
        let submissions_prefix = format!("{}/", submissions_path);

        Urls {
            base,
            submissions_path,
            submissions_prefix,
        }
    }

    pub fn submissions(&self) -> Url {
        self.base
            .join(&self.submissions_prefix)
            .expect("get submissions URL")
    }

    pub fn submission(&self, id: i32) -> Url {
        let id = format!("{}", id);
        self.submissions()
            .join(&id)
            .unwrap_or_else(|_| panic!("get URL for submission {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::Urls;

    #[test]
    fn submission_urls_nest_under_the_base() {
        let urls = Urls::new("http://api.example.com/", "submitData");

        assert_eq!(
            urls.submissions().as_str(),
            "http://api.example.com/submitData/"
        );
        assert_eq!(
            urls.submission(17).as_str(),
            "http://api.example.com/submitData/17"
        );
    }
}
