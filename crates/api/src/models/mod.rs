//! Domain models for the shop API.
//!
//! Request bodies (`New*`, `*Update`) and response shapes. Row types that
//! need conversion (users) stay private to their repository.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod stats;
pub mod user;
pub mod wishlist;

pub use address::{Address, AddressSnapshot, AddressUpdate, NewAddress};
pub use cart::{CartItem, CartLine};
pub use catalog::{Brand, Category};
pub use order::{Order, OrderLine, OrderTotals};
pub use product::{NewProduct, Product, ProductDetail, ProductSummary, ProductUpdate};
pub use review::Review;
pub use session::{CurrentUser, keys};
pub use stats::DashboardStats;
pub use user::User;
pub use wishlist::WishlistLine;
