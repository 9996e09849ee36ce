pub mod page_fetcher;

pub use page_fetcher::{parse_page, HttpPageFetcher};
