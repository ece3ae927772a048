//! Request context shown alongside the recorder

use serde::{Deserialize, Serialize};

/// What the fan asked for. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestContext {
    /// Who the video is for
    pub recipient: Option<String>,

    /// Birthday, pep talk, roast, ...
    pub occasion: Option<String>,

    /// Free-form instructions from the requester
    pub instructions: Option<String>,
}

impl RequestContext {
    /// One-line summary for a recording overlay
    pub fn headline(&self) -> Option<String> {
        match (&self.recipient, &self.occasion) {
            (Some(recipient), Some(occasion)) => Some(format!("{occasion} for {recipient}")),
            (Some(recipient), None) => Some(format!("For {recipient}")),
            (None, Some(occasion)) => Some(occasion.clone()),
            (None, None) => None,
        }
    }
}

/// Read-only source of the request context
pub trait MetadataProvider: Send + Sync {
    fn request_context(&self) -> Option<RequestContext>;
}

impl MetadataProvider for RequestContext {
    fn request_context(&self) -> Option<RequestContext> {
        Some(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline() {
        let ctx: RequestContext =
            serde_json::from_str(r#"{ "recipient": "Sam", "occasion": "Birthday" }"#).unwrap();
        assert_eq!(ctx.headline().as_deref(), Some("Birthday for Sam"));
        assert_eq!(RequestContext::default().headline(), None);
    }
}
