pub mod cart_items;
pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
