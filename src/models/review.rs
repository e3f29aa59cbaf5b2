use serde::{Deserialize, Serialize};

/// Best editorial review found for a title. The star rating is absent when
/// the reviewer did not assign one; the url can be absent on rows restored
/// from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewMatch {
    pub url: Option<String>,
    pub rating: Option<i32>,
    pub excerpt: Option<String>,
}
