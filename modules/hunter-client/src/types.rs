use serde::Deserialize;

/// Mailbox kind as reported by Hunter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailType {
    Generic,
    Personal,
    #[serde(other)]
    Unknown,
}

/// Which mailboxes a domain search should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailTypeFilter {
    /// Role mailboxes only (contact@, rh@, ...).
    #[default]
    Generic,
    Personal,
    All,
}

impl EmailTypeFilter {
    pub(crate) fn as_query(self) -> Option<&'static str> {
        match self {
            EmailTypeFilter::Generic => Some("generic"),
            EmailTypeFilter::Personal => Some("personal"),
            EmailTypeFilter::All => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainSearch {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub emails: Vec<DomainEmail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainEmail {
    pub value: String,
    #[serde(rename = "type", default)]
    pub email_type: Option<EmailType>,
    /// Provider score, 0-100. Hunter sends `null` for unscored addresses.
    #[serde(default)]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}
