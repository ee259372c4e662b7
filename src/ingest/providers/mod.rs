pub mod metadata;
pub mod pageviews;
