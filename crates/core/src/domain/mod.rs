pub mod client;
pub mod company;
pub mod product;
pub mod quote;
pub mod salesperson;
pub mod user;
