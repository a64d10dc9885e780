pub mod catalog;
pub mod fetcher;
pub mod game;
pub mod page;
pub mod provider;

pub use catalog::{all_providers, find_provider, is_category_slug, CatalogError};
pub use fetcher::{FetchError, PageFetcher};
pub use game::{thumbnail_file_name, GameRecord, GroupAssociation};
pub use page::{page_limit, Offset, PageRequest, PAGE_SIZE};
pub use provider::{Provider, ProviderMeta};
