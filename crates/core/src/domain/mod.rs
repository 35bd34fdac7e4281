pub mod catalog;
pub mod product;
pub mod questionnaire;
pub mod store;
