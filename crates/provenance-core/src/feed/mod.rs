mod fetcher;
mod models;
mod opml;
mod parser;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{FeedSource, HttpFetcher};
pub use models::{Article, ArticleInfo, NewArticle};
pub use opml::{parse_opml, parse_opml_file, OpmlEntry};
pub use parser::{parse_feed, ParsedFeed};
