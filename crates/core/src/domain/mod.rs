pub mod product;
pub mod sales;
