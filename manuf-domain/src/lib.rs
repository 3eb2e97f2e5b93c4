pub mod efficiency;
pub mod industry_model;
pub mod market;
pub mod procurement;
pub mod routing;
pub mod services;

pub use industry_model::*;
