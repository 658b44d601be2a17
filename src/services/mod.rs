pub mod activity_log;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod order_status;
pub mod orders;
pub mod reports;
pub mod users;

pub use activity_log::ActivityLogService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use order_status::OrderStatusService;
pub use orders::OrderService;
pub use reports::ReportService;
pub use users::UserService;
