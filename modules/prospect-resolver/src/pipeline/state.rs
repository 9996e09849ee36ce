use std::fmt;

use serde::Serialize;

use prospect_common::ResolutionResult;

/// Where one company is in the resolution cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Pending,
    WebsiteResolved {
        website: String,
    },
    WebsiteUnresolved,
    DirectoryLookup {
        website: String,
    },
    ScrapeFallback {
        website: String,
    },
    AiFallback {
        website: String,
        text: String,
        career_page_url: Option<String>,
    },
    Done(ResolutionResult),
}

/// Payload-free name of a state, recorded in the resolution path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateKind {
    Pending,
    WebsiteResolved,
    WebsiteUnresolved,
    DirectoryLookup,
    ScrapeFallback,
    AiFallback,
    Done,
}

impl ResolutionState {
    pub fn kind(&self) -> StateKind {
        match self {
            ResolutionState::Pending => StateKind::Pending,
            ResolutionState::WebsiteResolved { .. } => StateKind::WebsiteResolved,
            ResolutionState::WebsiteUnresolved => StateKind::WebsiteUnresolved,
            ResolutionState::DirectoryLookup { .. } => StateKind::DirectoryLookup,
            ResolutionState::ScrapeFallback { .. } => StateKind::ScrapeFallback,
            ResolutionState::AiFallback { .. } => StateKind::AiFallback,
            ResolutionState::Done(_) => StateKind::Done,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolutionState::Done(_))
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateKind::Pending => "PENDING",
            StateKind::WebsiteResolved => "WEBSITE_RESOLVED",
            StateKind::WebsiteUnresolved => "WEBSITE_UNRESOLVED",
            StateKind::DirectoryLookup => "DIRECTORY_LOOKUP",
            StateKind::ScrapeFallback => "SCRAPE_FALLBACK",
            StateKind::AiFallback => "AI_FALLBACK",
            StateKind::Done => "DONE",
        };
        f.write_str(s)
    }
}
