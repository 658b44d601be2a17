pub mod activity_log;
pub mod cart_item;
pub mod category;
pub mod order;
pub mod order_item;
pub mod payment_transaction;
pub mod product;
pub mod product_variant;
pub mod shipping_rate;
pub mod user;

pub use activity_log::Entity as ActivityLog;
pub use cart_item::Entity as CartItem;
pub use category::Entity as Category;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use payment_transaction::Entity as PaymentTransaction;
pub use product::Entity as Product;
pub use product_variant::Entity as ProductVariant;
pub use shipping_rate::Entity as ShippingRate;
pub use user::Entity as User;

pub use activity_log::Model as ActivityLogModel;
pub use cart_item::Model as CartItemModel;
pub use order::Model as OrderModel;
pub use order_item::Model as OrderItemModel;
pub use product::Model as ProductModel;
pub use product_variant::Model as ProductVariantModel;
pub use shipping_rate::Model as ShippingRateModel;
pub use user::Model as UserModel;
