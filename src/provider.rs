pub mod forecast;
pub mod link;
pub mod quote;
