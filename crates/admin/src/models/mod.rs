//! Domain models for the admin console.

pub mod analytics;
pub mod catalog;
pub mod dashboard;
pub mod operations;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{
    Category, CategoryInput, Product, ProductInput, ProductWithVariants, Variant, VariantInput,
};
pub use operations::{
    AssignPartner, Batch, BatchSummary, Delivery, DeliveryFilter, DeliveryOrder, DeliveryPartner,
    DeliveryPartnerInput, DeliveryView, Ingredient, IngredientInput, NewBatch, NewDelivery,
    Recipe, RecipeInput, Vendor, VendorInput,
};
pub use order::{
    CustomerSnapshot, CustomerSummary, DeliveryAddress, Order, OrderDetail, OrderItem,
    OrderListRow, OrderQuery, OrderSortBy, SortOrder, StatusUpdate,
};
pub use session::{CurrentStaff, keys as session_keys};
pub use user::{Profile, ProfileFilter, ProfileUpdate};
