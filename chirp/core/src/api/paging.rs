use crate::error::ChirpError;
use crate::http::Parameter;

/// Timeline paging controls
///
/// ```
/// use chirp_core::Paging;
///
/// let paging = Paging::new().with_count(50).with_since_id(1_000);
/// assert!(paging.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Paging {
    /// 1-based page number
    pub page: Option<u32>,
    /// Records per page
    pub count: Option<u32>,
    /// Only records newer than this id
    pub since_id: Option<u64>,
    /// Only records at or older than this id
    pub max_id: Option<u64>,
}

impl Paging {
    /// No paging constraints
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a page
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set records per page
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Only newer records
    #[must_use]
    pub fn with_since_id(mut self, since_id: u64) -> Self {
        self.since_id = Some(since_id);
        self
    }

    /// Only older records
    #[must_use]
    pub fn with_max_id(mut self, max_id: u64) -> Self {
        self.max_id = Some(max_id);
        self
    }

    /// Check ranges
    ///
    /// # Errors
    ///
    /// [`ChirpError::InvalidArgument`] when `page` or `count` is zero.
    pub fn validate(&self) -> Result<(), ChirpError> {
        if self.page == Some(0) {
            return Err(ChirpError::InvalidArgument(
                "page must be at least 1".to_string(),
            ));
        }
        if self.count == Some(0) {
            return Err(ChirpError::InvalidArgument(
                "count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Render the set fields as request parameters
    #[must_use]
    pub fn to_parameters(&self) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        if let Some(page) = self.page {
            parameters.push(Parameter::new("page", page));
        }
        if let Some(count) = self.count {
            parameters.push(Parameter::new("count", count));
        }
        if let Some(since_id) = self.since_id {
            parameters.push(Parameter::new("since_id", since_id));
        }
        if let Some(max_id) = self.max_id {
            parameters.push(Parameter::new("max_id", max_id));
        }
        parameters
    }
}
