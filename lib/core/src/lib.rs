pub mod aggregation;
pub mod category;
pub mod comment;
pub mod moderation;
pub mod page;
pub mod post;
pub mod vote;
