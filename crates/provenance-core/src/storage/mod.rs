mod database;
mod endpoint_repo;
mod article_repo;

pub use database::Database;
pub use endpoint_repo::EndpointRepository;
pub use article_repo::ArticleRepository;
