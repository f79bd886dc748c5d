pub mod mirror;

pub use mirror::{CrawlState, MirrorCrawler};
